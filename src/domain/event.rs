use crate::domain::model::{Money, Order, OrderId, OrderStatus, UserId};
use chrono::{DateTime, Utc};

/// ドメインイベント列挙型
/// チェックアウトと注文ライフサイクルの重要な出来事を表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// チェックアウトで注文が作成された
    OrderPlaced(OrderPlaced),
    /// 注文ステータスが変わった
    OrderStatusChanged(OrderStatusChanged),
    /// 注文作成後のクーポン利用記録に失敗した
    CouponUsageRecordingFailed(CouponUsageRecordingFailed),
}

impl DomainEvent {
    /// イベント名（ログ出力用）
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced(_) => "OrderPlaced",
            DomainEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            DomainEvent::CouponUsageRecordingFailed(_) => "CouponUsageRecordingFailed",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::OrderPlaced(e) => e.occurred_at,
            DomainEvent::OrderStatusChanged(e) => e.occurred_at,
            DomainEvent::CouponUsageRecordingFailed(e) => e.occurred_at,
        }
    }
}

/// 注文作成イベント
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub item_count: usize,
    pub total: Money,
    pub coupon_code: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl OrderPlaced {
    pub fn new(order: &Order, occurred_at: DateTime<Utc>) -> Self {
        Self {
            order_id: order.id(),
            user_id: order.user_id(),
            item_count: order.items().len(),
            total: order.total(),
            coupon_code: order.coupon_code().map(str::to_string),
            occurred_at,
        }
    }
}

/// 注文ステータス変更イベント
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

impl OrderStatusChanged {
    pub fn new(
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            from,
            to,
            occurred_at,
        }
    }
}

/// クーポン利用記録失敗イベント
/// 注文は有効なまま残るため、運用側での確認用に発行する
#[derive(Debug, Clone, PartialEq)]
pub struct CouponUsageRecordingFailed {
    pub order_id: OrderId,
    pub coupon_code: String,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl CouponUsageRecordingFailed {
    pub fn new(
        order_id: OrderId,
        coupon_code: String,
        reason: String,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            coupon_code,
            reason,
            occurred_at,
        }
    }
}
