use crate::domain::error::{codes, DomainError};
use crate::domain::model::BookId;

/// 在庫レコード
/// 書籍ごとに1件。数量は0未満にならない
#[derive(Debug, Clone, PartialEq)]
pub struct StockRecord {
    book_id: BookId,
    quantity: u32,
}

impl StockRecord {
    /// 新しい在庫レコードを作成
    ///
    /// # Arguments
    /// * `book_id` - 書籍ID
    /// * `quantity` - 初期在庫数
    pub fn new(book_id: BookId, quantity: u32) -> Self {
        Self { book_id, quantity }
    }

    /// 書籍IDを取得
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    /// 在庫数を取得
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// 在庫を減らす
    ///
    /// # Returns
    /// * `Ok(())` - 減算成功
    /// * `Err(DomainError::Validation)` - 数量が0
    /// * `Err(DomainError::Failure)` - 在庫不足（在庫数は変わらない）
    pub fn decrease(&mut self, quantity: u32) -> Result<(), DomainError> {
        ensure_positive(quantity)?;
        if !self.has_available_stock(quantity) {
            return Err(insufficient_stock(self.book_id, quantity, self.quantity));
        }
        self.quantity -= quantity;
        Ok(())
    }

    /// 在庫を増やす
    pub fn increase(&mut self, quantity: u32) -> Result<(), DomainError> {
        ensure_positive(quantity)?;
        self.quantity = self.quantity.checked_add(quantity).ok_or_else(|| {
            DomainError::validation(codes::INVALID_QUANTITY, "在庫数が上限を超えます")
        })?;
        Ok(())
    }

    /// 指定された数量の在庫が利用可能かチェック
    pub fn has_available_stock(&self, quantity: u32) -> bool {
        self.quantity >= quantity
    }
}

/// 数量が1以上であることを確認
pub fn ensure_positive(quantity: u32) -> Result<(), DomainError> {
    if quantity == 0 {
        return Err(DomainError::validation(
            codes::INVALID_QUANTITY,
            "数量は1以上である必要があります",
        ));
    }
    Ok(())
}

/// 在庫不足エラー
pub fn insufficient_stock(book_id: BookId, requested: u32, available: u32) -> DomainError {
    DomainError::failure(
        codes::INSUFFICIENT_STOCK,
        format!(
            "在庫が不足しています: book_id={}, requested={}, available={}",
            book_id, requested, available
        ),
    )
}

/// 在庫レコードが存在しないエラー
pub fn stock_not_found(book_id: BookId) -> DomainError {
    DomainError::not_found(
        codes::STOCK_NOT_FOUND,
        format!("在庫が登録されていません: {}", book_id),
    )
}
