// ドメインサービス
// 単一の集約に属さない計算を実装

use crate::domain::error::{codes, DomainError};
use crate::domain::model::{Cart, Coupon, DiscountType, Money};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// クーポン検証の結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouponDiscount {
    pub discount: Money,
    pub total_after_discount: Money,
}

/// クーポン検証
/// ストレージに触れない純粋な計算。利用回数の加算は行わない
pub struct CouponValidator;

impl CouponValidator {
    /// クーポンが小計に適用できるか判定し、割引額を計算する
    ///
    /// 存在しない・無効・期限切れ・上限到達はいずれもNotFoundとして区別しない
    ///
    /// # Arguments
    /// * `code` - 入力されたコード（エラーメッセージ用）
    /// * `coupon` - コードで検索した結果
    /// * `subtotal` - カートの小計
    /// * `now` - 判定時刻
    pub fn validate(
        code: &str,
        coupon: Option<&Coupon>,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<CouponDiscount, DomainError> {
        let coupon = match coupon {
            Some(coupon)
                if coupon.is_active() && !coupon.is_expired(now) && !coupon.is_exhausted() =>
            {
                coupon
            }
            _ => return Err(coupon_not_found(code)),
        };

        if subtotal < coupon.minimum_cart_amount() {
            return Err(DomainError::validation(
                codes::COUPON_MINIMUM_NOT_MET,
                format!(
                    "このクーポンはカート金額{}以上で利用できます",
                    coupon.minimum_cart_amount()
                ),
            ));
        }

        let discount = match coupon.discount_type() {
            DiscountType::Percentage => subtotal.percentage(coupon.value()),
            DiscountType::FixedAmount => Money::new(coupon.value())?.min(subtotal),
        };
        let discount = discount.min(subtotal);

        Ok(CouponDiscount {
            discount,
            total_after_discount: subtotal.saturating_sub(&discount),
        })
    }
}

/// 存在しないクーポンのエラー
pub fn coupon_not_found(code: &str) -> DomainError {
    DomainError::not_found(
        codes::COUPON_NOT_FOUND,
        format!("クーポンが見つかりません: {}", code),
    )
}

/// 送料・税額の計算ルール
/// 割引後の小計が無料配送の基準額以上なら送料無料
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPolicy {
    shipping_flat_fee: Money,
    free_shipping_threshold: Option<Money>,
    tax_rate_percent: Decimal,
}

impl PricingPolicy {
    /// 新しい計算ルールを作成
    ///
    /// # Arguments
    /// * `shipping_flat_fee` - 一律送料
    /// * `free_shipping_threshold` - 無料配送の基準額（Noneなら常に送料がかかる）
    /// * `tax_rate_percent` - 税率（%）
    pub fn new(
        shipping_flat_fee: Money,
        free_shipping_threshold: Option<Money>,
        tax_rate_percent: Decimal,
    ) -> Result<Self, DomainError> {
        if tax_rate_percent.is_sign_negative() && !tax_rate_percent.is_zero() {
            return Err(DomainError::validation(
                codes::INVALID_VALUE,
                format!("税率は0以上である必要があります: {}", tax_rate_percent),
            ));
        }
        Ok(Self {
            shipping_flat_fee,
            free_shipping_threshold,
            tax_rate_percent,
        })
    }

    /// 送料を計算
    pub fn shipping_cost(&self, discounted_subtotal: Money) -> Money {
        match self.free_shipping_threshold {
            Some(threshold) if discounted_subtotal >= threshold => Money::zero(),
            _ => self.shipping_flat_fee,
        }
    }

    /// 税額を計算
    pub fn tax(&self, discounted_subtotal: Money) -> Money {
        discounted_subtotal.percentage(self.tax_rate_percent)
    }

    /// カートの送料・税額を再計算する
    /// 空のカートには何も課金しない
    pub fn reprice(&self, cart: &mut Cart) {
        if cart.is_empty() {
            cart.set_charges(Money::zero(), Money::zero());
            return;
        }
        let base = cart.discounted_subtotal();
        cart.set_charges(self.shipping_cost(base), self.tax(base));
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            shipping_flat_fee: Money::from_cents(500),
            free_shipping_threshold: Some(Money::from_cents(10_000)),
            tax_rate_percent: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use crate::domain::model::{AuditStamp, BookId, NewCoupon, UserId};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn money(amount: Decimal) -> Money {
        Money::new(amount).unwrap()
    }

    fn coupon(discount_type: DiscountType, value: Decimal, minimum: Decimal) -> Coupon {
        Coupon::create(NewCoupon {
            code: "SAVE10".to_string(),
            discount_type,
            value,
            expiry_date: None,
            usage_limit: 0,
            minimum_cart_amount: money(minimum),
            is_active: true,
        })
        .unwrap()
    }

    #[test]
    fn test_percentage_coupon() {
        let coupon = coupon(DiscountType::Percentage, dec!(10), dec!(50.00));
        let result =
            CouponValidator::validate("SAVE10", Some(&coupon), money(dec!(60.00)), Utc::now())
                .unwrap();

        assert_eq!(result.discount.amount(), dec!(6.00));
        assert_eq!(result.total_after_discount.amount(), dec!(54.00));
    }

    #[test]
    fn test_fixed_coupon_is_capped_at_subtotal() {
        let coupon = coupon(DiscountType::FixedAmount, dec!(30), dec!(0));
        let result =
            CouponValidator::validate("SAVE10", Some(&coupon), money(dec!(20.00)), Utc::now())
                .unwrap();

        assert_eq!(result.discount.amount(), dec!(20.00));
        assert!(result.total_after_discount.is_zero());
    }

    #[test]
    fn test_minimum_cart_amount() {
        let coupon = coupon(DiscountType::Percentage, dec!(10), dec!(50.00));
        let err =
            CouponValidator::validate("SAVE10", Some(&coupon), money(dec!(49.99)), Utc::now())
                .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), codes::COUPON_MINIMUM_NOT_MET);
        assert!(err.message().contains("50.00"));
    }

    #[test]
    fn test_ineligible_coupons_are_masked_as_not_found() {
        let now = Utc::now();
        let subtotal = money(dec!(100));

        let missing = CouponValidator::validate("NOPE", None, subtotal, now).unwrap_err();

        let inactive = Coupon::reconstruct(
            "OFF".to_string(),
            DiscountType::Percentage,
            dec!(10),
            None,
            0,
            0,
            Money::zero(),
            false,
            AuditStamp::default(),
        );
        let inactive = CouponValidator::validate("OFF", Some(&inactive), subtotal, now).unwrap_err();

        let expired = Coupon::reconstruct(
            "OLD".to_string(),
            DiscountType::Percentage,
            dec!(10),
            Some(now - Duration::days(1)),
            0,
            0,
            Money::zero(),
            true,
            AuditStamp::default(),
        );
        let expired = CouponValidator::validate("OLD", Some(&expired), subtotal, now).unwrap_err();

        let exhausted = Coupon::reconstruct(
            "USED".to_string(),
            DiscountType::Percentage,
            dec!(10),
            None,
            3,
            3,
            Money::zero(),
            true,
            AuditStamp::default(),
        );
        let exhausted =
            CouponValidator::validate("USED", Some(&exhausted), subtotal, now).unwrap_err();

        for err in [missing, inactive, expired, exhausted] {
            assert_eq!(err.kind(), ErrorKind::NotFound);
            assert_eq!(err.code(), codes::COUPON_NOT_FOUND);
        }
    }

    #[test]
    fn test_expired_check_precedes_minimum() {
        let now = Utc::now();
        let expired = Coupon::reconstruct(
            "OLD".to_string(),
            DiscountType::Percentage,
            dec!(10),
            Some(now - Duration::days(1)),
            0,
            0,
            money(dec!(1000)),
            true,
            AuditStamp::default(),
        );
        let err =
            CouponValidator::validate("OLD", Some(&expired), money(dec!(1)), now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_free_shipping_threshold() {
        let policy =
            PricingPolicy::new(money(dec!(5.00)), Some(money(dec!(100.00))), Decimal::ZERO)
                .unwrap();

        assert_eq!(policy.shipping_cost(money(dec!(99.99))).amount(), dec!(5.00));
        assert!(policy.shipping_cost(money(dec!(100.00))).is_zero());
    }

    #[test]
    fn test_reprice_uses_discounted_subtotal() {
        let policy =
            PricingPolicy::new(money(dec!(5.00)), Some(money(dec!(100.00))), dec!(10)).unwrap();
        let mut cart = Cart::new(UserId::new());
        cart.add_item(BookId::new(), "Rust入門".to_string(), money(dec!(60.00)), 2)
            .unwrap();
        cart.apply_coupon("SAVE".to_string(), money(dec!(30.00)));

        policy.reprice(&mut cart);

        // 120 - 30 = 90 → 送料あり、税 9.00
        assert_eq!(cart.shipping_cost().amount(), dec!(5.00));
        assert_eq!(cart.tax().amount(), dec!(9.00));
        assert_eq!(cart.total().amount(), dec!(104.00));
    }

    #[test]
    fn test_empty_cart_has_no_charges() {
        let policy = PricingPolicy::default();
        let mut cart = Cart::new(UserId::new());
        policy.reprice(&mut cart);
        assert!(cart.total().is_zero());
    }

    #[test]
    fn test_negative_tax_rate_is_rejected() {
        assert!(PricingPolicy::new(Money::zero(), None, dec!(-1)).is_err());
    }
}
