use crate::adapter::database_error::DatabaseError;
use sqlx::{MySql, Pool};

/// マイグレーション一覧（適用順）
const MIGRATIONS: [(&str, &str); 6] = [
    (
        "001_create_books_table",
        include_str!("../../migrations/001_create_books_table.sql"),
    ),
    (
        "002_create_stocks_table",
        include_str!("../../migrations/002_create_stocks_table.sql"),
    ),
    (
        "003_create_coupons_table",
        include_str!("../../migrations/003_create_coupons_table.sql"),
    ),
    (
        "004_create_carts_table",
        include_str!("../../migrations/004_create_carts_table.sql"),
    ),
    (
        "005_create_orders_table",
        include_str!("../../migrations/005_create_orders_table.sql"),
    ),
    (
        "006_create_order_items_table",
        include_str!("../../migrations/006_create_order_items_table.sql"),
    ),
];

/// データベースマイグレーションを管理する構造体
pub struct DatabaseMigration {
    pool: Pool<MySql>,
}

impl DatabaseMigration {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// マイグレーションを実行
    /// 各ファイルは CREATE TABLE IF NOT EXISTS なので何度実行してもよい
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for (name, sql) in MIGRATIONS {
            tracing::debug!(migration = name, "running migration");
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("{} failed: {}", name, e)))?;
        }

        tracing::info!(count = MIGRATIONS.len(), "migrations completed");
        Ok(())
    }
}
