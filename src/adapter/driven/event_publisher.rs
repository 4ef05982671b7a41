use crate::domain::event::DomainEvent;
use crate::domain::port::{EventPublisher, PublisherError};
use std::sync::Mutex;

/// tracingイベント発行者
/// ドメインイベントを構造化ログとして出力する
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError> {
        let occurred_at = event.occurred_at().format("%Y-%m-%d %H:%M:%S");
        match event {
            DomainEvent::OrderPlaced(e) => {
                tracing::info!(
                    event = event.name(),
                    order_id = %e.order_id,
                    user_id = %e.user_id,
                    item_count = e.item_count,
                    total = %e.total,
                    coupon_code = e.coupon_code.as_deref().unwrap_or("-"),
                    %occurred_at,
                    "注文が作成されました"
                );
            }
            DomainEvent::OrderStatusChanged(e) => {
                tracing::info!(
                    event = event.name(),
                    order_id = %e.order_id,
                    from = %e.from,
                    to = %e.to,
                    %occurred_at,
                    "注文ステータスが変更されました"
                );
            }
            DomainEvent::CouponUsageRecordingFailed(e) => {
                tracing::warn!(
                    event = event.name(),
                    order_id = %e.order_id,
                    coupon_code = %e.coupon_code,
                    reason = %e.reason,
                    %occurred_at,
                    "クーポン利用回数を記録できませんでした"
                );
            }
        }
        Ok(())
    }
}

/// インメモリイベント発行者
/// 発行されたイベントを保持する。テストや通知モジュール未接続時の確認用
#[derive(Debug, Default)]
pub struct InMemoryEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 発行済みイベントのコピーを返す
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventPublisher for InMemoryEventPublisher {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| PublisherError::PublishingFailed(e.to_string()))?;
        events.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{CouponUsageRecordingFailed, OrderStatusChanged};
    use crate::domain::model::{OrderId, OrderStatus};
    use chrono::Utc;

    #[test]
    fn test_tracing_publisher_accepts_all_events() {
        let publisher = TracingEventPublisher::new();
        let order_id = OrderId::new();

        let changed = DomainEvent::OrderStatusChanged(OrderStatusChanged::new(
            order_id,
            OrderStatus::Pending,
            OrderStatus::Cancelled,
            Utc::now(),
        ));
        let failed = DomainEvent::CouponUsageRecordingFailed(CouponUsageRecordingFailed::new(
            order_id,
            "SPRING10".to_string(),
            "usage limit reached".to_string(),
            Utc::now(),
        ));

        assert!(publisher.publish(&changed).is_ok());
        assert!(publisher.publish(&failed).is_ok());
    }

    #[test]
    fn test_in_memory_publisher_records_in_order() {
        let publisher = InMemoryEventPublisher::new();
        let order_id = OrderId::new();
        let first = DomainEvent::OrderStatusChanged(OrderStatusChanged::new(
            order_id,
            OrderStatus::Pending,
            OrderStatus::Processing,
            Utc::now(),
        ));
        let second = DomainEvent::OrderStatusChanged(OrderStatusChanged::new(
            order_id,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            Utc::now(),
        ));

        publisher.publish(&first).unwrap();
        publisher.publish(&second).unwrap();

        assert_eq!(publisher.events(), vec![first, second]);
    }
}
