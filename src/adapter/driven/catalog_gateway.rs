use crate::adapter::database_error::{decode_error, query_error};
use crate::domain::model::{BookId, Money};
use crate::domain::port::{BookSnapshot, CatalogGateway, RepositoryError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{MySql, Pool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// MySQLカタログゲートウェイ
/// booksテーブルから書名と価格を読む
pub struct MySqlCatalogGateway {
    pool: Pool<MySql>,
}

impl MySqlCatalogGateway {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogGateway for MySqlCatalogGateway {
    async fn find_book(&self, book_id: BookId) -> Result<Option<BookSnapshot>, RepositoryError> {
        let row = sqlx::query("SELECT title, price FROM books WHERE id = ?")
            .bind(book_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("書籍の取得に失敗しました"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let title: String = row
            .try_get("title")
            .map_err(|e| decode_error("書名の読み込みに失敗しました", e))?;
        let price: Decimal = row
            .try_get("price")
            .map_err(|e| decode_error("価格の読み込みに失敗しました", e))?;
        let price = Money::new(price).map_err(|e| decode_error("価格の解析に失敗しました", e))?;

        Ok(Some(BookSnapshot {
            book_id,
            title,
            price,
        }))
    }
}

/// インメモリカタログゲートウェイ
#[derive(Default)]
pub struct InMemoryCatalogGateway {
    books: Mutex<HashMap<BookId, BookSnapshot>>,
}

impl InMemoryCatalogGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 書籍を登録する（同じIDなら上書き）
    pub async fn add_book(&self, book: BookSnapshot) {
        self.books.lock().await.insert(book.book_id, book);
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalogGateway {
    async fn find_book(&self, book_id: BookId) -> Result<Option<BookSnapshot>, RepositoryError> {
        Ok(self.books.lock().await.get(&book_id).cloned())
    }
}

/// キャッシュ付きカタログゲートウェイ
/// 見つかった書籍だけを一定時間保持する。見つからなかった結果は保持しない
pub struct CachedCatalogGateway {
    inner: Arc<dyn CatalogGateway>,
    ttl: Duration,
    entries: RwLock<HashMap<BookId, (Instant, BookSnapshot)>>,
}

impl CachedCatalogGateway {
    /// # Arguments
    /// * `inner` - 実際に問い合わせるゲートウェイ
    /// * `ttl` - キャッシュの有効期間
    pub fn new(inner: Arc<dyn CatalogGateway>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CatalogGateway for CachedCatalogGateway {
    async fn find_book(&self, book_id: BookId) -> Result<Option<BookSnapshot>, RepositoryError> {
        {
            let entries = self.entries.read().await;
            if let Some((cached_at, book)) = entries.get(&book_id) {
                if cached_at.elapsed() < self.ttl {
                    return Ok(Some(book.clone()));
                }
            }
        }

        let found = self.inner.find_book(book_id).await?;

        let mut entries = self.entries.write().await;
        match &found {
            Some(book) => {
                entries.insert(book_id, (Instant::now(), book.clone()));
            }
            None => {
                entries.remove(&book_id);
            }
        }
        Ok(found)
    }
}
