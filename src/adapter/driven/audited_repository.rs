use crate::domain::model::{Auditable, Coupon, Order, OrderId, OrderStatus, UserId};
use crate::domain::port::{
    Clock, CouponRepository, OrderRepository, RepositoryError, UsageIncrement,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// システム時計
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn stamp<T: Auditable>(mut entity: T, clock: &dyn Clock) -> T {
    entity.audit_stamp_mut().touch(clock.now());
    entity
}

/// 監査日時を付与する注文リポジトリのデコレーター
/// 保存のたびに更新日時を、初回保存時は作成日時も設定する
pub struct AuditedOrderRepository {
    inner: Arc<dyn OrderRepository>,
    clock: Arc<dyn Clock>,
}

impl AuditedOrderRepository {
    pub fn new(inner: Arc<dyn OrderRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { inner, clock }
    }
}

#[async_trait]
impl OrderRepository for AuditedOrderRepository {
    async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
        self.inner.save(stamp(order, self.clock.as_ref())).await
    }

    async fn transition_status(
        &self,
        order: Order,
        from: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        self.inner
            .transition_status(stamp(order, self.clock.as_ref()), from)
            .await
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.inner.find_by_id(order_id).await
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.inner.find_by_user(user_id).await
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        self.inner.find_by_status(status).await
    }

    fn next_identity(&self) -> OrderId {
        self.inner.next_identity()
    }
}

/// 監査日時を付与するクーポンリポジトリのデコレーター
pub struct AuditedCouponRepository {
    inner: Arc<dyn CouponRepository>,
    clock: Arc<dyn Clock>,
}

impl AuditedCouponRepository {
    pub fn new(inner: Arc<dyn CouponRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { inner, clock }
    }
}

#[async_trait]
impl CouponRepository for AuditedCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        self.inner.find_by_code(code).await
    }

    async fn insert(&self, coupon: Coupon) -> Result<Coupon, RepositoryError> {
        self.inner.insert(stamp(coupon, self.clock.as_ref())).await
    }

    // 更新日時はこのデコレーターの時計で上書きする
    async fn increment_usage_if_available(
        &self,
        code: &str,
        _at: DateTime<Utc>,
    ) -> Result<UsageIncrement, RepositoryError> {
        self.inner
            .increment_usage_if_available(code, self.clock.now())
            .await
    }
}
