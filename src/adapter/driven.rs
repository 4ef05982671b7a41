// 駆動される側アダプター（リポジトリ実装など）

mod audited_repository;
mod cart_store;
mod catalog_gateway;
mod coupon_repository;
mod event_publisher;
mod order_repository;
mod stock_repository;
mod tracing_logger;

pub use audited_repository::{AuditedCouponRepository, AuditedOrderRepository, SystemClock};
pub use cart_store::{InMemoryCartStore, MySqlCartStore};
pub use catalog_gateway::{CachedCatalogGateway, InMemoryCatalogGateway, MySqlCatalogGateway};
pub use coupon_repository::{InMemoryCouponRepository, MySqlCouponRepository};
pub use event_publisher::{InMemoryEventPublisher, TracingEventPublisher};
pub use order_repository::{InMemoryOrderRepository, MySqlOrderRepository};
pub use stock_repository::{InMemoryStockRepository, MySqlStockRepository};
pub use tracing_logger::TracingLogger;
