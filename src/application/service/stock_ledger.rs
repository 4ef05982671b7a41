use crate::application::contract::{InventoryApi, StockLine};
use crate::application::ApplicationError;
use crate::domain::error::{codes, DomainError};
use crate::domain::model::{
    ensure_positive, insufficient_stock, stock_not_found, BookId, StockRecord,
};
use crate::domain::port::{Logger, RepositoryError, StockAdjustment, StockRepository};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

const COMPONENT: &str = "StockLedger";

/// 在庫台帳
/// 書籍ごとの在庫数を条件付き更新で増減する
pub struct StockLedger {
    stock_repository: Arc<dyn StockRepository>,
    logger: Arc<dyn Logger>,
}

impl StockLedger {
    /// 新しい在庫台帳を作成
    ///
    /// # Arguments
    /// * `stock_repository` - 在庫リポジトリ
    /// * `logger` - ロガー
    pub fn new(stock_repository: Arc<dyn StockRepository>, logger: Arc<dyn Logger>) -> Self {
        Self {
            stock_repository,
            logger,
        }
    }

    /// 在庫レコードを登録する（書籍がカタログに追加されたとき）
    ///
    /// # Returns
    /// * `Ok(StockRecord)` - 登録された在庫
    /// * `Err(ApplicationError)` - 既に登録済み（Conflict）、または保存失敗
    pub async fn create_stock(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<StockRecord, ApplicationError> {
        let stock = StockRecord::new(book_id, quantity);
        match self.stock_repository.insert(&stock).await {
            Ok(()) => Ok(stock),
            Err(RepositoryError::DuplicateKey(_)) => Err(DomainError::conflict(
                codes::STOCK_DUPLICATE,
                format!("在庫は既に登録されています: {}", book_id),
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// 書籍IDで在庫を取得
    pub async fn get_stock(&self, book_id: BookId) -> Result<StockRecord, ApplicationError> {
        self.stock_repository
            .find_by_book_id(book_id)
            .await?
            .ok_or_else(|| stock_not_found(book_id).into())
    }

    /// 在庫一覧を取得
    /// `max_quantity`を指定した場合はその数以下の在庫だけを返す
    pub async fn list_stock(
        &self,
        max_quantity: Option<u32>,
    ) -> Result<Vec<StockRecord>, ApplicationError> {
        let stocks = match max_quantity {
            Some(max) => self.stock_repository.find_by_max_quantity(max).await?,
            None => self.stock_repository.find_all().await?,
        };
        Ok(stocks)
    }

    /// 在庫を減らす
    ///
    /// # Returns
    /// * `Ok(())` - 減算成功
    /// * `Err` - 数量が0（Validation）、未登録（NotFound）、在庫不足（Failure）。失敗時は何も変更しない
    pub async fn decrease_stock(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<(), ApplicationError> {
        ensure_positive(quantity)?;

        match self
            .stock_repository
            .decrease_if_available(book_id, quantity)
            .await?
        {
            StockAdjustment::Applied => Ok(()),
            StockAdjustment::Insufficient { available } => {
                Err(insufficient_stock(book_id, quantity, available).into())
            }
            StockAdjustment::NotFound => Err(stock_not_found(book_id).into()),
        }
    }

    /// 在庫を増やす
    pub async fn increase_stock(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<(), ApplicationError> {
        ensure_positive(quantity)?;

        if self.stock_repository.increase(book_id, quantity).await? {
            Ok(())
        } else {
            Err(stock_not_found(book_id).into())
        }
    }

    fn log_context(line: &StockLine) -> Option<HashMap<String, String>> {
        let mut context = HashMap::new();
        context.insert("book_id".to_string(), line.book_id.to_string());
        context.insert("quantity".to_string(), line.quantity.to_string());
        Some(context)
    }
}

#[async_trait]
impl InventoryApi for StockLedger {
    async fn check_stock(&self, lines: &[StockLine]) -> Result<(), ApplicationError> {
        let mut errors = Vec::new();

        for line in lines {
            if let Err(e) = ensure_positive(line.quantity) {
                errors.push(e);
                continue;
            }
            match self.stock_repository.find_by_book_id(line.book_id).await? {
                Some(stock) if stock.has_available_stock(line.quantity) => {}
                Some(stock) => errors.push(insufficient_stock(
                    line.book_id,
                    line.quantity,
                    stock.quantity(),
                )),
                None => errors.push(stock_not_found(line.book_id)),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApplicationError::from_errors(errors))
        }
    }

    async fn decrease_stock_batch(&self, lines: &[StockLine]) -> Result<(), ApplicationError> {
        let mut applied: Vec<StockLine> = Vec::with_capacity(lines.len());

        for line in lines {
            if let Err(e) = self.decrease_stock(line.book_id, line.quantity).await {
                self.logger.warn(
                    COMPONENT,
                    &format!("在庫の一括減算に失敗したため{}件を戻します: {}", applied.len(), e),
                    None,
                    Self::log_context(line),
                );
                for done in applied.iter().rev() {
                    if let Err(undo) = self.increase_stock(done.book_id, done.quantity).await {
                        self.logger.error(
                            COMPONENT,
                            &format!("在庫の補償に失敗しました: {}", undo),
                            None,
                            Self::log_context(done),
                        );
                    }
                }
                return Err(e);
            }
            applied.push(*line);
        }

        Ok(())
    }

    async fn increase_stock_batch(&self, lines: &[StockLine]) -> Result<(), ApplicationError> {
        let mut errors = Vec::new();

        for line in lines {
            if let Err(e) = self.increase_stock(line.book_id, line.quantity).await {
                self.logger.error(
                    COMPONENT,
                    &format!("在庫の加算に失敗しました: {}", e),
                    None,
                    Self::log_context(line),
                );
                errors.extend(e.errors());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApplicationError::from_errors(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{InMemoryStockRepository, TracingLogger};
    use crate::domain::error::ErrorKind;

    async fn ledger_with(stocks: &[(BookId, u32)]) -> (StockLedger, Arc<InMemoryStockRepository>) {
        let repository = Arc::new(InMemoryStockRepository::new());
        for (book_id, quantity) in stocks {
            repository
                .insert(&StockRecord::new(*book_id, *quantity))
                .await
                .unwrap();
        }
        let ledger = StockLedger::new(repository.clone(), Arc::new(TracingLogger::new()));
        (ledger, repository)
    }

    async fn quantity(repository: &InMemoryStockRepository, book_id: BookId) -> u32 {
        repository
            .find_by_book_id(book_id)
            .await
            .unwrap()
            .unwrap()
            .quantity()
    }

    #[tokio::test]
    async fn test_decrease_more_than_available_leaves_quantity_unchanged() {
        let book = BookId::new();
        let (ledger, repository) = ledger_with(&[(book, 2)]).await;

        let err = ledger.decrease_stock(book, 5).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Failure);
        assert_eq!(err.code(), codes::INSUFFICIENT_STOCK);
        assert_eq!(quantity(&repository, book).await, 2);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_validation() {
        let book = BookId::new();
        let (ledger, _) = ledger_with(&[(book, 2)]).await;

        let err = ledger.decrease_stock(book, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = ledger.increase_stock(book, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unknown_book_is_not_found() {
        let (ledger, _) = ledger_with(&[]).await;
        let err = ledger.decrease_stock(BookId::new(), 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_check_stock_reports_every_problem() {
        let ok = BookId::new();
        let short = BookId::new();
        let missing = BookId::new();
        let (ledger, _) = ledger_with(&[(ok, 10), (short, 1)]).await;

        let err = ledger
            .check_stock(&[
                StockLine::new(ok, 3),
                StockLine::new(short, 2),
                StockLine::new(missing, 1),
            ])
            .await
            .unwrap_err();

        let errors = err.errors();
        assert_eq!(errors.len(), 2);
        assert!(err.has_code(codes::INSUFFICIENT_STOCK));
        assert!(err.has_code(codes::STOCK_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_batch_decrease_compensates_on_failure() {
        let first = BookId::new();
        let second = BookId::new();
        let (ledger, repository) = ledger_with(&[(first, 5), (second, 1)]).await;

        let result = ledger
            .decrease_stock_batch(&[StockLine::new(first, 3), StockLine::new(second, 2)])
            .await;

        assert!(result.is_err());
        assert_eq!(quantity(&repository, first).await, 5);
        assert_eq!(quantity(&repository, second).await, 1);
    }

    #[tokio::test]
    async fn test_batch_decrease_applies_every_line() {
        let first = BookId::new();
        let second = BookId::new();
        let (ledger, repository) = ledger_with(&[(first, 5), (second, 2)]).await;

        ledger
            .decrease_stock_batch(&[StockLine::new(first, 3), StockLine::new(second, 2)])
            .await
            .unwrap();

        assert_eq!(quantity(&repository, first).await, 2);
        assert_eq!(quantity(&repository, second).await, 0);
    }

    #[tokio::test]
    async fn test_create_stock_twice_is_conflict() {
        let book = BookId::new();
        let (ledger, _) = ledger_with(&[]).await;

        ledger.create_stock(book, 3).await.unwrap();
        let err = ledger.create_stock(book, 3).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), codes::STOCK_DUPLICATE);
    }

    #[tokio::test]
    async fn test_list_low_stock() {
        let (ledger, _) =
            ledger_with(&[(BookId::new(), 3), (BookId::new(), 10), (BookId::new(), 1)]).await;

        assert_eq!(ledger.list_stock(None).await.unwrap().len(), 3);
        let low = ledger.list_stock(Some(5)).await.unwrap();
        assert_eq!(low.len(), 2);
        assert!(low.iter().all(|s| s.quantity() <= 5));
    }
}
