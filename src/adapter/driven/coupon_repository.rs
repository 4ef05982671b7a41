use crate::adapter::database_error::{decode_error, query_error};
use crate::domain::model::{AuditStamp, Auditable, Coupon, DiscountType, Money};
use crate::domain::port::{CouponRepository, RepositoryError, UsageIncrement};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;

const SELECT_COUPON: &str = r#"
    SELECT code, discount_type, value, expiry_date, usage_limit, usage_count,
           minimum_cart_amount, is_active, created_at, updated_at
    FROM coupons
    WHERE code = ?
"#;

/// MySQLクーポンリポジトリ
/// codeカラムはutf8mb4_binなので大文字小文字を区別して比較される
pub struct MySqlCouponRepository {
    pool: Pool<MySql>,
}

impl MySqlCouponRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    fn to_coupon(row: &MySqlRow) -> Result<Coupon, RepositoryError> {
        let discount_type: String = row
            .try_get("discount_type")
            .map_err(|e| decode_error("割引種別の読み込みに失敗しました", e))?;
        let discount_type = DiscountType::from_string(&discount_type)
            .map_err(|e| decode_error("割引種別の解析に失敗しました", e))?;
        let minimum: Decimal = row
            .try_get("minimum_cart_amount")
            .map_err(|e| decode_error("最低金額の読み込みに失敗しました", e))?;
        let minimum =
            Money::new(minimum).map_err(|e| decode_error("最低金額の解析に失敗しました", e))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| decode_error("作成日時の読み込みに失敗しました", e))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| decode_error("更新日時の読み込みに失敗しました", e))?;

        Ok(Coupon::reconstruct(
            row.try_get("code")
                .map_err(|e| decode_error("コードの読み込みに失敗しました", e))?,
            discount_type,
            row.try_get("value")
                .map_err(|e| decode_error("割引値の読み込みに失敗しました", e))?,
            row.try_get("expiry_date")
                .map_err(|e| decode_error("有効期限の読み込みに失敗しました", e))?,
            row.try_get("usage_limit")
                .map_err(|e| decode_error("利用上限の読み込みに失敗しました", e))?,
            row.try_get("usage_count")
                .map_err(|e| decode_error("利用回数の読み込みに失敗しました", e))?,
            minimum,
            row.try_get("is_active")
                .map_err(|e| decode_error("有効フラグの読み込みに失敗しました", e))?,
            AuditStamp::reconstruct(created_at, updated_at),
        ))
    }
}

#[async_trait]
impl CouponRepository for MySqlCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query(SELECT_COUPON)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("クーポンの取得に失敗しました"))?;

        row.as_ref().map(Self::to_coupon).transpose()
    }

    async fn insert(&self, coupon: Coupon) -> Result<Coupon, RepositoryError> {
        let now = Utc::now();
        let audit = coupon.audit();

        sqlx::query(
            r#"
            INSERT INTO coupons (code, discount_type, value, expiry_date, usage_limit, usage_count,
                                 minimum_cart_amount, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(coupon.code())
        .bind(coupon.discount_type().to_string())
        .bind(coupon.value())
        .bind(coupon.expiry_date())
        .bind(coupon.usage_limit())
        .bind(coupon.usage_count())
        .bind(coupon.minimum_cart_amount().amount())
        .bind(coupon.is_active())
        .bind(audit.created_at().unwrap_or(now))
        .bind(audit.updated_at().unwrap_or(now))
        .execute(&self.pool)
        .await
        .map_err(query_error("クーポンの登録に失敗しました"))?;

        Ok(coupon)
    }

    async fn increment_usage_if_available(
        &self,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<UsageIncrement, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET usage_count = usage_count + 1, updated_at = ?
            WHERE code = ? AND (usage_limit = 0 OR usage_count < usage_limit)
            "#,
        )
        .bind(at)
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(query_error("クーポン利用回数の更新に失敗しました"))?;

        if result.rows_affected() == 1 {
            return Ok(UsageIncrement::Recorded);
        }

        let exists = sqlx::query("SELECT 1 FROM coupons WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("クーポンの取得に失敗しました"))?
            .is_some();

        Ok(if exists {
            UsageIncrement::LimitReached
        } else {
            UsageIncrement::NotFound
        })
    }
}

/// インメモリクーポンリポジトリ
#[derive(Default)]
pub struct InMemoryCouponRepository {
    coupons: Mutex<HashMap<String, Coupon>>,
}

impl InMemoryCouponRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CouponRepository for InMemoryCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        Ok(self.coupons.lock().await.get(code).cloned())
    }

    async fn insert(&self, coupon: Coupon) -> Result<Coupon, RepositoryError> {
        let mut coupons = self.coupons.lock().await;
        if coupons.contains_key(coupon.code()) {
            return Err(RepositoryError::DuplicateKey(coupon.code().to_string()));
        }
        coupons.insert(coupon.code().to_string(), coupon.clone());
        Ok(coupon)
    }

    async fn increment_usage_if_available(
        &self,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<UsageIncrement, RepositoryError> {
        let mut coupons = self.coupons.lock().await;
        match coupons.get_mut(code) {
            Some(coupon) => match coupon.increment_usage() {
                Ok(()) => {
                    coupon.audit_stamp_mut().touch(at);
                    Ok(UsageIncrement::Recorded)
                }
                Err(_) => Ok(UsageIncrement::LimitReached),
            },
            None => Ok(UsageIncrement::NotFound),
        }
    }
}
