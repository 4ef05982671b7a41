use crate::adapter::database_error::{decode_error, query_error};
use crate::domain::model::{Cart, UserId};
use crate::domain::port::{CartStore, RepositoryError};
use async_trait::async_trait;
use sqlx::{MySql, Pool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// MySQLカートストア
/// カート全体をJSONとして1行に保存する
pub struct MySqlCartStore {
    pool: Pool<MySql>,
}

impl MySqlCartStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for MySqlCartStore {
    async fn load(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query("SELECT payload FROM carts WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("カートの取得に失敗しました"))?;

        match row {
            Some(row) => {
                let payload: serde_json::Value = row
                    .try_get("payload")
                    .map_err(|e| decode_error("カートの読み込みに失敗しました", e))?;
                let cart = serde_json::from_value(payload)
                    .map_err(|e| decode_error("カートの復元に失敗しました", e))?;
                Ok(Some(cart))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let payload = serde_json::to_value(cart)
            .map_err(|e| RepositoryError::OperationFailed(format!("カートの変換に失敗しました: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO carts (user_id, payload)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE
                payload = VALUES(payload)
            "#,
        )
        .bind(cart.user_id().to_string())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(query_error("カートの保存に失敗しました"))?;

        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(query_error("カートの削除に失敗しました"))?;
        Ok(())
    }
}

/// インメモリカートストア
#[derive(Default)]
pub struct InMemoryCartStore {
    carts: Mutex<HashMap<UserId, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.carts.lock().await.get(&user_id).cloned())
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        self.carts
            .lock()
            .await
            .insert(cart.user_id(), cart.clone());
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.carts.lock().await.remove(&user_id);
        Ok(())
    }
}
