// アプリケーションサービス
// ユースケースごとにポートを組み合わせる

mod cart_service;
mod checkout_service;
mod coupon_service;
mod order_service;
mod stock_ledger;

pub use cart_service::CartService;
pub use checkout_service::{CheckoutReceipt, CheckoutService, CheckoutStep};
pub use coupon_service::CouponService;
pub use order_service::OrderService;
pub use stock_ledger::StockLedger;
