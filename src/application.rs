pub mod cancellation;
pub mod contract;
pub mod error;
pub mod service;

pub use error::ApplicationError;
