use crate::application::service::CheckoutReceipt;
use crate::domain::model::{
    AuditStamp, Cart, CartItem, Coupon, Order, OrderItem, ShippingAddress, StockRecord,
};
use serde::Serialize;

// 金額はすべて小数点以下2桁の文字列で返す

/// カート明細用のレスポンスDTO
#[derive(Serialize)]
pub struct CartItemResponse {
    pub book_id: String,
    pub title: String,
    pub unit_price: String,
    pub quantity: u32,
    pub subtotal: String,
}

/// カート用のレスポンスDTO
#[derive(Serialize)]
pub struct CartResponse {
    pub user_id: String,
    pub items: Vec<CartItemResponse>,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub discount: String,
    pub shipping_cost: String,
    pub tax: String,
    pub total: String,
}

/// 注文一覧用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub item_count: usize,
    pub total: String,
    pub created_at: Option<String>,
}

/// 注文詳細用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderDetailResponse {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: ShippingAddressResponse,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub discount: String,
    pub shipping_cost: String,
    pub tax: String,
    pub total: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// 注文明細用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderItemResponse {
    pub book_id: String,
    pub title: String,
    pub unit_price: String,
    pub quantity: u32,
    pub subtotal: String,
}

/// 配送先住所用のレスポンスDTO
#[derive(Serialize)]
pub struct ShippingAddressResponse {
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
}

/// チェックアウト結果のレスポンスDTO
#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: OrderDetailResponse,
    pub warnings: Vec<String>,
}

/// クーポン用のレスポンスDTO
#[derive(Serialize)]
pub struct CouponResponse {
    pub code: String,
    pub discount_type: String,
    pub value: String,
    pub expiry_date: Option<String>,
    pub usage_limit: u32,
    pub usage_count: u32,
    pub minimum_cart_amount: String,
    pub is_active: bool,
}

/// 在庫用のレスポンスDTO
#[derive(Serialize)]
pub struct StockResponse {
    pub book_id: String,
    pub quantity: u32,
}

impl CartResponse {
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            user_id: cart.user_id().to_string(),
            items: cart.items().iter().map(CartItemResponse::from_item).collect(),
            coupon_code: cart.coupon_code().map(str::to_string),
            subtotal: cart.subtotal().to_string(),
            discount: cart.discount().to_string(),
            shipping_cost: cart.shipping_cost().to_string(),
            tax: cart.tax().to_string(),
            total: cart.total().to_string(),
        }
    }
}

impl CartItemResponse {
    fn from_item(item: &CartItem) -> Self {
        Self {
            book_id: item.book_id().to_string(),
            title: item.title().to_string(),
            unit_price: item.unit_price().to_string(),
            quantity: item.quantity(),
            subtotal: item.subtotal().to_string(),
        }
    }
}

fn created_at(audit: AuditStamp) -> Option<String> {
    audit.created_at().map(|at| at.to_rfc3339())
}

impl OrderSummaryResponse {
    /// ドメインオブジェクトからOrderSummaryResponseを作成
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status().to_string(),
            item_count: order.items().len(),
            total: order.total().to_string(),
            created_at: created_at(order.audit()),
        }
    }
}

impl OrderDetailResponse {
    /// ドメインオブジェクトからOrderDetailResponseを作成
    pub fn from_order(order: &Order) -> Self {
        let totals = order.totals();
        Self {
            order_id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status().to_string(),
            items: order
                .items()
                .iter()
                .map(OrderItemResponse::from_order_item)
                .collect(),
            shipping_address: ShippingAddressResponse::from_shipping_address(
                order.shipping_address(),
            ),
            coupon_code: order.coupon_code().map(str::to_string),
            subtotal: totals.subtotal().to_string(),
            discount: totals.discount().to_string(),
            shipping_cost: totals.shipping_cost().to_string(),
            tax: totals.tax().to_string(),
            total: order.total().to_string(),
            created_at: created_at(order.audit()),
            updated_at: order.audit().updated_at().map(|at| at.to_rfc3339()),
        }
    }
}

impl OrderItemResponse {
    fn from_order_item(item: &OrderItem) -> Self {
        Self {
            book_id: item.book_id().to_string(),
            title: item.title().to_string(),
            unit_price: item.unit_price().to_string(),
            quantity: item.quantity(),
            subtotal: item.subtotal().to_string(),
        }
    }
}

impl ShippingAddressResponse {
    pub fn from_shipping_address(address: &ShippingAddress) -> Self {
        Self {
            postal_code: address.postal_code().to_string(),
            prefecture: address.prefecture().to_string(),
            city: address.city().to_string(),
            address_line1: address.address_line1().to_string(),
            address_line2: address.address_line2().map(str::to_string),
        }
    }
}

impl CheckoutResponse {
    pub fn from_receipt(receipt: &CheckoutReceipt) -> Self {
        Self {
            order: OrderDetailResponse::from_order(&receipt.order),
            warnings: receipt.warnings.clone(),
        }
    }
}

impl CouponResponse {
    pub fn from_coupon(coupon: &Coupon) -> Self {
        Self {
            code: coupon.code().to_string(),
            discount_type: coupon.discount_type().to_string(),
            value: coupon.value().to_string(),
            expiry_date: coupon.expiry_date().map(|at| at.to_rfc3339()),
            usage_limit: coupon.usage_limit(),
            usage_count: coupon.usage_count(),
            minimum_cart_amount: coupon.minimum_cart_amount().to_string(),
            is_active: coupon.is_active(),
        }
    }
}

impl StockResponse {
    pub fn from_stock(stock: &StockRecord) -> Self {
        Self {
            book_id: stock.book_id().to_string(),
            quantity: stock.quantity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BookId, Money, OrderId, OrderTotals, UserId};
    use rust_decimal_macros::dec;

    fn address() -> ShippingAddress {
        ShippingAddress::new(
            "1500043".to_string(),
            "東京都".to_string(),
            "渋谷区".to_string(),
            "道玄坂1-1-1".to_string(),
            Some("ビル名".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_cart_response_from_cart() {
        let user_id = UserId::new();
        let mut cart = Cart::new(user_id);
        cart.add_item(
            BookId::new(),
            "Rust入門".to_string(),
            Money::new(dec!(20)).unwrap(),
            3,
        )
        .unwrap();
        cart.apply_coupon("SPRING10".to_string(), Money::new(dec!(6)).unwrap());
        cart.set_charges(Money::new(dec!(5)).unwrap(), Money::zero());

        let response = CartResponse::from_cart(&cart);

        assert_eq!(response.user_id, user_id.to_string());
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].unit_price, "20.00");
        assert_eq!(response.items[0].subtotal, "60.00");
        assert_eq!(response.coupon_code.as_deref(), Some("SPRING10"));
        assert_eq!(response.subtotal, "60.00");
        assert_eq!(response.discount, "6.00");
        assert_eq!(response.shipping_cost, "5.00");
        assert_eq!(response.total, "59.00");
    }

    #[test]
    fn test_order_detail_response_from_order() {
        let price = Money::new(dec!(12.50)).unwrap();
        let order = Order::place(
            OrderId::new(),
            UserId::new(),
            address(),
            vec![OrderItem::new(BookId::new(), "DDD入門".to_string(), price, 2).unwrap()],
            OrderTotals::new(
                price.multiply(2),
                Money::new(dec!(2.50)).unwrap(),
                Money::new(dec!(5)).unwrap(),
                Money::new(dec!(1.10)).unwrap(),
            )
            .unwrap(),
            Some("WELCOME".to_string()),
        )
        .unwrap();

        let response = OrderDetailResponse::from_order(&order);

        assert_eq!(response.status, "Pending");
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].subtotal, "25.00");
        assert_eq!(response.subtotal, "25.00");
        assert_eq!(response.discount, "2.50");
        assert_eq!(response.total, "28.60");
        assert_eq!(response.coupon_code.as_deref(), Some("WELCOME"));
        assert_eq!(
            response.shipping_address.address_line2.as_deref(),
            Some("ビル名")
        );
        assert!(response.created_at.is_none());
    }

    #[test]
    fn test_stock_response_from_stock() {
        let book_id = BookId::new();
        let response = StockResponse::from_stock(&StockRecord::new(book_id, 50));

        assert_eq!(response.book_id, book_id.to_string());
        assert_eq!(response.quantity, 50);
    }
}
