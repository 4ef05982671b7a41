// ドメインモデル（エンティティと値オブジェクト）

mod audit;
mod cart;
mod coupon;
mod order;
mod stock;
mod value_objects;

pub use value_objects::{BookId, Money, OrderId, OrderStatus, ShippingAddress, UserId};

pub use audit::{AuditStamp, Auditable};
pub use cart::{Cart, CartItem};
pub use coupon::{Coupon, DiscountType, NewCoupon};
pub use order::{Order, OrderItem, OrderTotals};
pub use stock::{ensure_positive, insufficient_stock, stock_not_found, StockRecord};
