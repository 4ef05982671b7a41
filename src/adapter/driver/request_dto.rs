use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// カートへの書籍追加用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct AddItemRequest {
    pub book_id: Uuid,
    pub quantity: u32,
}

/// 数量変更用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

/// クーポン適用用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

/// 配送先住所のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct ShippingAddressRequest {
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
}

/// チェックアウト用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddressRequest,
}

/// クーポン作成用のリクエストDTO
/// 金額は文字列・数値のどちらでも受け付ける
#[derive(Serialize, Deserialize)]
pub struct CreateCouponRequest {
    pub code: String,
    /// "Percentage" または "FixedAmount"
    pub discount_type: String,
    pub value: Decimal,
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_limit: u32,
    pub minimum_cart_amount: Option<Decimal>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// 在庫作成用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CreateStockRequest {
    pub book_id: Uuid,
    pub quantity: u32,
}

/// 在庫の増減用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct AdjustStockRequest {
    pub quantity: u32,
}

/// ステータス別注文一覧取得用のクエリパラメータ
#[derive(Deserialize)]
pub struct OrdersQueryParams {
    pub status: String,
}

/// 在庫一覧取得用のクエリパラメータ
#[derive(Deserialize)]
pub struct StockQueryParams {
    pub max_quantity: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_coupon_request_defaults() {
        let json = r#"{"code":"SPRING10","discount_type":"Percentage","value":"10"}"#;
        let request: CreateCouponRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.value, dec!(10));
        assert_eq!(request.usage_limit, 0);
        assert!(request.is_active);
        assert!(request.expiry_date.is_none());
        assert!(request.minimum_cart_amount.is_none());
    }

    #[test]
    fn test_checkout_request_without_address_line2() {
        let json = r#"{
            "shipping_address": {
                "postal_code": "1500043",
                "prefecture": "東京都",
                "city": "渋谷区",
                "address_line1": "道玄坂1-1-1"
            }
        }"#;
        let request: CheckoutRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.shipping_address.postal_code, "1500043");
        assert_eq!(request.shipping_address.address_line2, None);
    }

    #[test]
    fn test_add_item_request_rejects_negative_quantity() {
        let json = format!(r#"{{"book_id":"{}","quantity":-1}}"#, Uuid::new_v4());
        assert!(serde_json::from_str::<AddItemRequest>(&json).is_err());
    }
}
