use crate::domain::error::{codes, DomainError};
use crate::domain::model::{AuditStamp, Auditable, Money};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 割引の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountType {
    /// 小計に対する百分率
    Percentage,
    /// 定額
    FixedAmount,
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "Percentage"),
            DiscountType::FixedAmount => write!(f, "FixedAmount"),
        }
    }
}

impl DiscountType {
    /// 文字列からDiscountTypeを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "Percentage" => Ok(DiscountType::Percentage),
            "FixedAmount" => Ok(DiscountType::FixedAmount),
            _ => Err(DomainError::validation(
                codes::COUPON_INVALID,
                format!("無効な割引種別: {}", s),
            )),
        }
    }
}

/// クーポン作成時の入力
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub expiry_date: Option<DateTime<Utc>>,
    /// 0は無制限
    pub usage_limit: u32,
    pub minimum_cart_amount: Money,
    pub is_active: bool,
}

/// クーポン
/// コードは大文字小文字を区別する一意キー
#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    code: String,
    discount_type: DiscountType,
    value: Decimal,
    expiry_date: Option<DateTime<Utc>>,
    usage_limit: u32,
    usage_count: u32,
    minimum_cart_amount: Money,
    is_active: bool,
    audit: AuditStamp,
}

impl Coupon {
    /// 新しいクーポンを作成
    /// 不正な項目はすべてまとめて返す
    pub fn create(new_coupon: NewCoupon) -> Result<Self, Vec<DomainError>> {
        let mut errors = Vec::new();

        if new_coupon.code.trim().is_empty() {
            errors.push(DomainError::validation(
                codes::COUPON_INVALID,
                "クーポンコードは空にできません",
            ));
        }

        match new_coupon.discount_type {
            DiscountType::Percentage => {
                if new_coupon.value <= Decimal::ZERO || new_coupon.value > Decimal::ONE_HUNDRED {
                    errors.push(DomainError::validation(
                        codes::COUPON_INVALID,
                        "割引率は0より大きく100以下である必要があります",
                    ));
                }
            }
            DiscountType::FixedAmount => {
                if new_coupon.value <= Decimal::ZERO {
                    errors.push(DomainError::validation(
                        codes::COUPON_INVALID,
                        "割引額は0より大きい必要があります",
                    ));
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            code: new_coupon.code,
            discount_type: new_coupon.discount_type,
            value: new_coupon.value,
            expiry_date: new_coupon.expiry_date,
            usage_limit: new_coupon.usage_limit,
            usage_count: 0,
            minimum_cart_amount: new_coupon.minimum_cart_amount,
            is_active: new_coupon.is_active,
            audit: AuditStamp::default(),
        })
    }

    /// データベースから取得したデータでクーポンを再構築
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        code: String,
        discount_type: DiscountType,
        value: Decimal,
        expiry_date: Option<DateTime<Utc>>,
        usage_limit: u32,
        usage_count: u32,
        minimum_cart_amount: Money,
        is_active: bool,
        audit: AuditStamp,
    ) -> Self {
        Self {
            code,
            discount_type,
            value,
            expiry_date,
            usage_limit,
            usage_count,
            minimum_cart_amount,
            is_active,
            audit,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn discount_type(&self) -> DiscountType {
        self.discount_type
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
    }

    pub fn usage_limit(&self) -> u32 {
        self.usage_limit
    }

    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    pub fn minimum_cart_amount(&self) -> Money {
        self.minimum_cart_amount
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn audit(&self) -> AuditStamp {
        self.audit
    }

    /// 指定時刻で有効期限切れか
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < now)
    }

    /// 利用上限に達しているか（上限0は無制限）
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit > 0 && self.usage_count >= self.usage_limit
    }

    /// 利用回数を1増やす
    /// ストレージの条件付き更新を持たないアダプター（インメモリ）用
    pub fn increment_usage(&mut self) -> Result<(), DomainError> {
        if self.is_exhausted() {
            return Err(DomainError::conflict(
                codes::COUPON_USAGE_LIMIT_REACHED,
                format!("クーポンの利用上限に達しました: {}", self.code),
            ));
        }
        self.usage_count += 1;
        Ok(())
    }
}

impl Auditable for Coupon {
    fn audit_stamp_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn new_coupon(discount_type: DiscountType, value: Decimal) -> NewCoupon {
        NewCoupon {
            code: "SAVE10".to_string(),
            discount_type,
            value,
            expiry_date: None,
            usage_limit: 2,
            minimum_cart_amount: Money::zero(),
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_value_range() {
        assert!(Coupon::create(new_coupon(DiscountType::Percentage, dec!(100))).is_ok());
        assert!(Coupon::create(new_coupon(DiscountType::Percentage, dec!(0))).is_err());
        assert!(Coupon::create(new_coupon(DiscountType::Percentage, dec!(100.01))).is_err());
    }

    #[test]
    fn test_create_reports_every_problem() {
        let mut input = new_coupon(DiscountType::FixedAmount, dec!(-1));
        input.code = " ".to_string();
        let errors = Coupon::create(input).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_increment_usage_respects_limit() {
        let mut coupon = Coupon::create(new_coupon(DiscountType::Percentage, dec!(10))).unwrap();
        coupon.increment_usage().unwrap();
        coupon.increment_usage().unwrap();
        let err = coupon.increment_usage().unwrap_err();

        assert_eq!(err.code(), codes::COUPON_USAGE_LIMIT_REACHED);
        assert_eq!(coupon.usage_count(), 2);
        assert!(coupon.is_exhausted());
    }

    #[test]
    fn test_unlimited_coupon_is_never_exhausted() {
        let mut input = new_coupon(DiscountType::Percentage, dec!(10));
        input.usage_limit = 0;
        let mut coupon = Coupon::create(input).unwrap();
        for _ in 0..5 {
            coupon.increment_usage().unwrap();
        }
        assert!(!coupon.is_exhausted());
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let mut input = new_coupon(DiscountType::Percentage, dec!(10));
        input.expiry_date = Some(now - Duration::minutes(1));
        let coupon = Coupon::create(input).unwrap();
        assert!(coupon.is_expired(now));
        assert!(!coupon.is_expired(now - Duration::hours(1)));
    }
}
