use crate::adapter::database_error::{decode_error, query_error};
use crate::domain::model::{BookId, StockRecord};
use crate::domain::port::{RepositoryError, StockAdjustment, StockRepository};
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// MySQL在庫リポジトリ
/// 在庫数の増減は条件付きUPDATE1文で行う
#[derive(Clone)]
pub struct MySqlStockRepository {
    pool: Pool<MySql>,
}

impl MySqlStockRepository {
    /// 新しいMySQL在庫リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    fn to_stock(row: &MySqlRow) -> Result<StockRecord, RepositoryError> {
        let book_id: String = row
            .try_get("book_id")
            .map_err(|e| decode_error("書籍IDの読み込みに失敗しました", e))?;
        let book_id = BookId::from_string(&book_id)
            .map_err(|e| decode_error("書籍IDの解析に失敗しました", e))?;
        let quantity: u32 = row
            .try_get("quantity")
            .map_err(|e| decode_error("在庫数の読み込みに失敗しました", e))?;
        Ok(StockRecord::new(book_id, quantity))
    }
}

#[async_trait]
impl StockRepository for MySqlStockRepository {
    async fn find_by_book_id(
        &self,
        book_id: BookId,
    ) -> Result<Option<StockRecord>, RepositoryError> {
        let row = sqlx::query("SELECT book_id, quantity FROM stocks WHERE book_id = ?")
            .bind(book_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("在庫の取得に失敗しました"))?;

        row.as_ref().map(Self::to_stock).transpose()
    }

    async fn insert(&self, stock: &StockRecord) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO stocks (book_id, quantity) VALUES (?, ?)")
            .bind(stock.book_id().to_string())
            .bind(stock.quantity())
            .execute(&self.pool)
            .await
            .map_err(query_error("在庫の登録に失敗しました"))?;
        Ok(())
    }

    async fn decrease_if_available(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<StockAdjustment, RepositoryError> {
        let result = sqlx::query(
            "UPDATE stocks SET quantity = quantity - ? WHERE book_id = ? AND quantity >= ?",
        )
        .bind(quantity)
        .bind(book_id.to_string())
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(query_error("在庫の減算に失敗しました"))?;

        if result.rows_affected() == 1 {
            return Ok(StockAdjustment::Applied);
        }

        // 減算できなかった理由を調べる（結果は参考値）
        match self.find_by_book_id(book_id).await? {
            Some(stock) => Ok(StockAdjustment::Insufficient {
                available: stock.quantity(),
            }),
            None => Ok(StockAdjustment::NotFound),
        }
    }

    async fn increase(&self, book_id: BookId, quantity: u32) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE stocks SET quantity = quantity + ? WHERE book_id = ?")
            .bind(quantity)
            .bind(book_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(query_error("在庫の加算に失敗しました"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_all(&self) -> Result<Vec<StockRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT book_id, quantity FROM stocks ORDER BY book_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("在庫一覧の取得に失敗しました"))?;

        rows.iter().map(Self::to_stock).collect()
    }

    async fn find_by_max_quantity(
        &self,
        max_quantity: u32,
    ) -> Result<Vec<StockRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT book_id, quantity FROM stocks WHERE quantity <= ? ORDER BY book_id ASC",
        )
        .bind(max_quantity)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("在庫一覧の取得に失敗しました"))?;

        rows.iter().map(Self::to_stock).collect()
    }
}

/// インメモリ在庫リポジトリ
/// 確認と更新を1つのロックの中で行う
#[derive(Default)]
pub struct InMemoryStockRepository {
    stocks: Mutex<BTreeMap<BookId, u32>>,
}

impl InMemoryStockRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StockRepository for InMemoryStockRepository {
    async fn find_by_book_id(
        &self,
        book_id: BookId,
    ) -> Result<Option<StockRecord>, RepositoryError> {
        let stocks = self.stocks.lock().await;
        Ok(stocks
            .get(&book_id)
            .map(|quantity| StockRecord::new(book_id, *quantity)))
    }

    async fn insert(&self, stock: &StockRecord) -> Result<(), RepositoryError> {
        let mut stocks = self.stocks.lock().await;
        if stocks.contains_key(&stock.book_id()) {
            return Err(RepositoryError::DuplicateKey(stock.book_id().to_string()));
        }
        stocks.insert(stock.book_id(), stock.quantity());
        Ok(())
    }

    async fn decrease_if_available(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<StockAdjustment, RepositoryError> {
        let mut stocks = self.stocks.lock().await;
        let Some(current) = stocks.get_mut(&book_id) else {
            return Ok(StockAdjustment::NotFound);
        };

        let mut stock = StockRecord::new(book_id, *current);
        if stock.decrease(quantity).is_err() {
            return Ok(StockAdjustment::Insufficient {
                available: *current,
            });
        }
        *current = stock.quantity();
        Ok(StockAdjustment::Applied)
    }

    async fn increase(&self, book_id: BookId, quantity: u32) -> Result<bool, RepositoryError> {
        let mut stocks = self.stocks.lock().await;
        let Some(current) = stocks.get_mut(&book_id) else {
            return Ok(false);
        };

        let mut stock = StockRecord::new(book_id, *current);
        stock
            .increase(quantity)
            .map_err(|e| RepositoryError::OperationFailed(e.to_string()))?;
        *current = stock.quantity();
        Ok(true)
    }

    async fn find_all(&self) -> Result<Vec<StockRecord>, RepositoryError> {
        let stocks = self.stocks.lock().await;
        Ok(stocks
            .iter()
            .map(|(book_id, quantity)| StockRecord::new(*book_id, *quantity))
            .collect())
    }

    async fn find_by_max_quantity(
        &self,
        max_quantity: u32,
    ) -> Result<Vec<StockRecord>, RepositoryError> {
        let stocks = self.stocks.lock().await;
        Ok(stocks
            .iter()
            .filter(|(_, quantity)| **quantity <= max_quantity)
            .map(|(book_id, quantity)| StockRecord::new(*book_id, *quantity))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_decrease_if_available() {
        let repository = InMemoryStockRepository::new();
        let book = BookId::new();
        repository.insert(&StockRecord::new(book, 2)).await.unwrap();

        assert_eq!(
            repository.decrease_if_available(book, 5).await.unwrap(),
            StockAdjustment::Insufficient { available: 2 }
        );
        assert_eq!(
            repository.decrease_if_available(book, 2).await.unwrap(),
            StockAdjustment::Applied
        );
        assert_eq!(
            repository
                .decrease_if_available(BookId::new(), 1)
                .await
                .unwrap(),
            StockAdjustment::NotFound
        );
    }

    #[tokio::test]
    async fn test_insert_duplicate() {
        let repository = InMemoryStockRepository::new();
        let stock = StockRecord::new(BookId::new(), 1);
        repository.insert(&stock).await.unwrap();

        let err = repository.insert(&stock).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_concurrent_decrease_never_goes_negative() {
        let repository = Arc::new(InMemoryStockRepository::new());
        let book = BookId::new();
        repository.insert(&StockRecord::new(book, 5)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let repository = repository.clone();
            handles.push(tokio::spawn(async move {
                repository.decrease_if_available(book, 1).await.unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap() == StockAdjustment::Applied {
                applied += 1;
            }
        }

        assert_eq!(applied, 5);
        let stock = repository.find_by_book_id(book).await.unwrap().unwrap();
        assert_eq!(stock.quantity(), 0);
    }

    #[tokio::test]
    async fn test_increase_unknown_book() {
        let repository = InMemoryStockRepository::new();
        assert!(!repository.increase(BookId::new(), 1).await.unwrap());
    }
}
