use crate::application::contract::{CouponQuote, DiscountApi, ValidateCouponRequest};
use crate::application::ApplicationError;
use crate::domain::error::{codes, DomainError};
use crate::domain::model::{Coupon, NewCoupon};
use crate::domain::port::{Clock, CouponRepository, Logger, RepositoryError, UsageIncrement};
use crate::domain::service::{coupon_not_found, CouponValidator};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

const COMPONENT: &str = "CouponService";

/// クーポンサービス
/// クーポンの登録・参照と、割引モジュールの窓口（検証・利用記録）を提供する
pub struct CouponService {
    coupon_repository: Arc<dyn CouponRepository>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
}

impl CouponService {
    pub fn new(
        coupon_repository: Arc<dyn CouponRepository>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            coupon_repository,
            clock,
            logger,
        }
    }

    /// クーポンを登録する
    ///
    /// # Returns
    /// * `Ok(Coupon)` - 登録されたクーポン
    /// * `Err(ApplicationError)` - 入力不正（Validation）、コード重複（Conflict）
    pub async fn create_coupon(&self, new_coupon: NewCoupon) -> Result<Coupon, ApplicationError> {
        let coupon = Coupon::create(new_coupon)?;
        let code = coupon.code().to_string();

        match self.coupon_repository.insert(coupon).await {
            Ok(saved) => {
                self.logger.info(
                    COMPONENT,
                    "クーポンを登録しました",
                    None,
                    Some(HashMap::from([("code".to_string(), code)])),
                );
                Ok(saved)
            }
            Err(RepositoryError::DuplicateKey(_)) => Err(DomainError::conflict(
                codes::COUPON_DUPLICATE,
                format!("クーポンコードは既に使われています: {}", code),
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// コードでクーポンを取得する（管理用。期限切れ・無効も返す）
    pub async fn get_coupon(&self, code: &str) -> Result<Coupon, ApplicationError> {
        self.coupon_repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| coupon_not_found(code).into())
    }
}

#[async_trait]
impl DiscountApi for CouponService {
    async fn validate_coupon(
        &self,
        request: ValidateCouponRequest,
    ) -> Result<CouponQuote, ApplicationError> {
        let coupon = self.coupon_repository.find_by_code(&request.code).await?;
        let result = CouponValidator::validate(
            &request.code,
            coupon.as_ref(),
            request.subtotal,
            self.clock.now(),
        )?;

        Ok(CouponQuote {
            discount: result.discount,
            total_after_discount: result.total_after_discount,
        })
    }

    async fn record_usage(&self, code: &str) -> Result<(), ApplicationError> {
        match self
            .coupon_repository
            .increment_usage_if_available(code, self.clock.now())
            .await?
        {
            UsageIncrement::Recorded => {
                self.logger.debug(
                    COMPONENT,
                    "クーポンの利用を記録しました",
                    None,
                    Some(HashMap::from([("code".to_string(), code.to_string())])),
                );
                Ok(())
            }
            UsageIncrement::LimitReached => Err(DomainError::conflict(
                codes::COUPON_USAGE_LIMIT_REACHED,
                format!("クーポンの利用上限に達しました: {}", code),
            )
            .into()),
            UsageIncrement::NotFound => Err(coupon_not_found(code).into()),
        }
    }
}
