// モジュール間の窓口
// 注文側は割引・在庫のモデルを直接扱わず、ここのDTOだけでやり取りする

use crate::application::ApplicationError;
use crate::domain::model::{BookId, Money};
use async_trait::async_trait;

/// クーポン検証リクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal: Money,
}

/// クーポン検証結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouponQuote {
    pub discount: Money,
    pub total_after_discount: Money,
}

/// 割引モジュールの窓口
#[async_trait]
pub trait DiscountApi: Send + Sync {
    /// クーポンを検証して割引額を計算する。利用回数は変えない
    async fn validate_coupon(
        &self,
        request: ValidateCouponRequest,
    ) -> Result<CouponQuote, ApplicationError>;

    /// 利用回数を1増やす
    /// 上限到達はConflict、存在しないコードはNotFound
    async fn record_usage(&self, code: &str) -> Result<(), ApplicationError>;
}

/// 在庫操作の1行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLine {
    pub book_id: BookId,
    pub quantity: u32,
}

impl StockLine {
    pub fn new(book_id: BookId, quantity: u32) -> Self {
        Self { book_id, quantity }
    }
}

/// 在庫モジュールの窓口
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// すべての行の在庫が足りるか確認する
    /// 不足・未登録の行はすべてまとめて返す
    async fn check_stock(&self, lines: &[StockLine]) -> Result<(), ApplicationError>;

    /// すべての行の在庫を減らす
    /// 途中で失敗した場合は、それまでに減らした行を戻してからエラーを返す
    async fn decrease_stock_batch(&self, lines: &[StockLine]) -> Result<(), ApplicationError>;

    /// すべての行の在庫を増やす（補償・キャンセル時の戻し）
    async fn increase_stock_batch(&self, lines: &[StockLine]) -> Result<(), ApplicationError>;
}
