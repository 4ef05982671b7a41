use crate::adapter::database_error::{decode_error, query_error};
use crate::domain::model::{
    AuditStamp, BookId, Money, Order, OrderId, OrderItem, OrderStatus, OrderTotals,
    ShippingAddress, UserId,
};
use crate::domain::port::{OrderRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;

const SELECT_ORDERS: &str = r#"
    SELECT
        o.id, o.user_id, o.status,
        o.postal_code, o.prefecture, o.city, o.address_line1, o.address_line2,
        o.subtotal, o.discount, o.shipping_cost, o.tax, o.coupon_code,
        o.created_at, o.updated_at,
        oi.book_id, oi.title, oi.unit_price, oi.quantity
    FROM orders o
    LEFT JOIN order_items oi ON o.id = oi.order_id
"#;

/// MySQL注文リポジトリ
/// 注文と注文明細を1トランザクションで保存する
pub struct MySqlOrderRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderRepository {
    /// 新しいMySQL注文リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// JOINした行から注文のリストを構築する
    /// 行の並び順（注文単位）を保ったまま明細をまとめる
    fn build_orders(rows: &[MySqlRow]) -> Result<Vec<Order>, RepositoryError> {
        let mut groups: Vec<(String, Vec<&MySqlRow>)> = Vec::new();
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| decode_error("注文IDの読み込みに失敗しました", e))?;
            match groups.last_mut() {
                Some((last_id, group)) if *last_id == id => group.push(row),
                _ => groups.push((id, vec![row])),
            }
        }

        groups
            .into_iter()
            .map(|(id, group)| Self::build_order(&id, &group))
            .collect()
    }

    fn build_order(id: &str, rows: &[&MySqlRow]) -> Result<Order, RepositoryError> {
        let first = rows
            .first()
            .ok_or_else(|| RepositoryError::FetchFailed(format!("注文の行がありません: {}", id)))?;

        let order_id =
            OrderId::from_string(id).map_err(|e| decode_error("注文IDの解析に失敗しました", e))?;
        let user_id: String = get(first, "user_id")?;
        let user_id = UserId::from_string(&user_id)
            .map_err(|e| decode_error("ユーザーIDの解析に失敗しました", e))?;
        let status: String = get(first, "status")?;
        let status = OrderStatus::from_string(&status)
            .map_err(|e| decode_error("注文ステータスの解析に失敗しました", e))?;

        let shipping_address = ShippingAddress::new(
            get(first, "postal_code")?,
            get(first, "prefecture")?,
            get(first, "city")?,
            get(first, "address_line1")?,
            get(first, "address_line2")?,
        )
        .map_err(|errors| decode_error("配送先住所の構築に失敗しました", join(&errors)))?;

        let totals = OrderTotals::new(
            money(first, "subtotal")?,
            money(first, "discount")?,
            money(first, "shipping_cost")?,
            money(first, "tax")?,
        )
        .map_err(|e| decode_error("注文金額の構築に失敗しました", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            // LEFT JOINなので明細のない注文はbook_idがNULLになる
            let Some(book_id) = get::<Option<String>>(row, "book_id")? else {
                continue;
            };
            let book_id = BookId::from_string(&book_id)
                .map_err(|e| decode_error("書籍IDの解析に失敗しました", e))?;
            let item = OrderItem::new(
                book_id,
                get(row, "title")?,
                money(row, "unit_price")?,
                get(row, "quantity")?,
            )
            .map_err(|e| decode_error("注文明細の構築に失敗しました", e))?;
            items.push(item);
        }

        let created_at: DateTime<Utc> = get(first, "created_at")?;
        let updated_at: DateTime<Utc> = get(first, "updated_at")?;

        Ok(Order::reconstruct(
            order_id,
            user_id,
            shipping_address,
            status,
            items,
            totals,
            get(first, "coupon_code")?,
            AuditStamp::reconstruct(created_at, updated_at),
        ))
    }
}

fn get<T>(row: &MySqlRow, column: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(column)
        .map_err(|e| decode_error(&format!("{}の読み込みに失敗しました", column), e))
}

fn money(row: &MySqlRow, column: &str) -> Result<Money, RepositoryError> {
    let amount: Decimal = get(row, column)?;
    Money::new(amount).map_err(|e| decode_error(&format!("{}の解析に失敗しました", column), e))
}

fn join(errors: &[crate::domain::error::DomainError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
        let now = Utc::now();
        let audit = order.audit();
        let address = order.shipping_address();
        let totals = order.totals();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_error("トランザクション開始に失敗しました"))?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, postal_code, prefecture, city,
                                address_line1, address_line2, subtotal, discount,
                                shipping_cost, tax, coupon_code, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(order.id().to_string())
        .bind(order.user_id().to_string())
        .bind(order.status().to_string())
        .bind(address.postal_code())
        .bind(address.prefecture())
        .bind(address.city())
        .bind(address.address_line1())
        .bind(address.address_line2())
        .bind(totals.subtotal().amount())
        .bind(totals.discount().amount())
        .bind(totals.shipping_cost().amount())
        .bind(totals.tax().amount())
        .bind(order.coupon_code())
        .bind(audit.created_at().unwrap_or(now))
        .bind(audit.updated_at().unwrap_or(now))
        .execute(&mut *tx)
        .await
        .map_err(query_error("注文の保存に失敗しました"))?;

        // 明細は作成後に変わらないので、既にあれば書き込まない
        let existing = sqlx::query("SELECT COUNT(*) AS n FROM order_items WHERE order_id = ?")
            .bind(order.id().to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(query_error("注文明細の確認に失敗しました"))?;
        let existing: i64 = get(&existing, "n")?;

        if existing == 0 {
            for (line_no, item) in order.items().iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO order_items (order_id, line_no, book_id, title, unit_price, quantity)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(order.id().to_string())
                .bind(line_no as u32)
                .bind(item.book_id().to_string())
                .bind(item.title())
                .bind(item.unit_price().amount())
                .bind(item.quantity())
                .execute(&mut *tx)
                .await
                .map_err(query_error("注文明細の保存に失敗しました"))?;
            }
        }

        tx.commit()
            .await
            .map_err(query_error("トランザクションのコミットに失敗しました"))?;

        Ok(order)
    }

    async fn transition_status(
        &self,
        order: Order,
        from: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(order.status().to_string())
        .bind(order.audit().updated_at().unwrap_or_else(Utc::now))
        .bind(order.id().to_string())
        .bind(from.to_string())
        .execute(&self.pool)
        .await
        .map_err(query_error("注文ステータスの更新に失敗しました"))?;

        Ok((result.rows_affected() == 1).then_some(order))
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{} WHERE o.id = ? ORDER BY oi.line_no ASC", SELECT_ORDERS);
        let rows = sqlx::query(&sql)
            .bind(order_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("注文の取得に失敗しました"))?;

        Ok(Self::build_orders(&rows)?.into_iter().next())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{} WHERE o.user_id = ? ORDER BY o.created_at DESC, o.id, oi.line_no ASC",
            SELECT_ORDERS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("ユーザー別注文一覧の取得に失敗しました"))?;

        Self::build_orders(&rows)
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{} WHERE o.status = ? ORDER BY o.created_at DESC, o.id, oi.line_no ASC",
            SELECT_ORDERS
        );
        let rows = sqlx::query(&sql)
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("ステータス別注文一覧の取得に失敗しました"))?;

        Self::build_orders(&rows)
    }

    fn next_identity(&self) -> OrderId {
        OrderId::new()
    }
}

/// インメモリ注文リポジトリ
/// 作成日時が同じ（監査日時なしを含む）場合は保存順の新しいものを先に返す
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<OrderId, (u64, Order)>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn find_where(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        let orders = self.orders.lock().await;
        let mut found: Vec<&(u64, Order)> =
            orders.values().filter(|(_, order)| predicate(order)).collect();
        found.sort_by(|(seq_a, a), (seq_b, b)| {
            b.audit()
                .created_at()
                .cmp(&a.audit().created_at())
                .then(seq_b.cmp(seq_a))
        });
        found.into_iter().map(|(_, order)| order.clone()).collect()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.lock().await;
        let seq = match orders.get(&order.id()) {
            Some((seq, _)) => *seq,
            None => orders.len() as u64,
        };
        orders.insert(order.id(), (seq, order.clone()));
        Ok(order)
    }

    async fn transition_status(
        &self,
        order: Order,
        from: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.orders.lock().await;
        match orders.get_mut(&order.id()) {
            Some((_, stored)) if stored.status() == from => {
                *stored = order.clone();
                Ok(Some(order))
            }
            _ => Ok(None),
        }
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.lock().await;
        Ok(orders.get(&order_id).map(|(_, order)| order.clone()))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.find_where(|order| order.user_id() == user_id).await)
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.find_where(|order| order.status() == status).await)
    }

    fn next_identity(&self) -> OrderId {
        OrderId::new()
    }
}
