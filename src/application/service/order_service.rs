use crate::application::contract::{InventoryApi, StockLine};
use crate::application::ApplicationError;
use crate::domain::error::{codes, DomainError};
use crate::domain::event::{DomainEvent, OrderStatusChanged};
use crate::domain::model::{Order, OrderId, OrderStatus, UserId};
use crate::domain::port::{Clock, EventPublisher, Logger, OrderRepository};
use std::collections::HashMap;
use std::sync::Arc;

const COMPONENT: &str = "OrderService";

/// 注文サービス
/// 注文の参照とステータス遷移を提供する
/// キャンセル・失敗に遷移した注文の在庫は在庫台帳に戻す
pub struct OrderService {
    order_repository: Arc<dyn OrderRepository>,
    inventory_api: Arc<dyn InventoryApi>,
    event_publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
}

impl OrderService {
    pub fn new(
        order_repository: Arc<dyn OrderRepository>,
        inventory_api: Arc<dyn InventoryApi>,
        event_publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            order_repository,
            inventory_api,
            event_publisher,
            clock,
            logger,
        }
    }

    /// 注文IDで注文を取得（管理用）
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        self.order_repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id).into())
    }

    /// ユーザー本人の注文を取得
    /// 他人の注文は存在しないものとして扱う
    pub async fn get_order_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, ApplicationError> {
        let order = self.get_order(order_id).await?;
        if order.user_id() != user_id {
            return Err(order_not_found(order_id).into());
        }
        Ok(order)
    }

    /// ユーザーの注文一覧（新しい順）
    pub async fn list_orders_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.order_repository.find_by_user(user_id).await?)
    }

    /// ステータスで注文を絞り込む（新しい順）
    pub async fn list_orders_by_status(
        &self,
        status: OrderStatus,
    ) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.order_repository.find_by_status(status).await?)
    }

    /// ユーザーが自分の注文をキャンセルする
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, ApplicationError> {
        let order = self.get_order_for_user(user_id, order_id).await?;
        self.transition(order, Order::cancel).await
    }

    /// 処理中にする
    pub async fn start_processing(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        let order = self.get_order(order_id).await?;
        self.transition(order, Order::start_processing).await
    }

    /// 発送済みにする
    pub async fn mark_as_shipped(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        let order = self.get_order(order_id).await?;
        self.transition(order, Order::mark_as_shipped).await
    }

    /// 配達完了にする
    pub async fn mark_as_delivered(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        let order = self.get_order(order_id).await?;
        self.transition(order, Order::mark_as_delivered).await
    }

    /// 失敗にする（決済失敗など）
    pub async fn mark_as_failed(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        let order = self.get_order(order_id).await?;
        self.transition(order, Order::mark_as_failed).await
    }

    /// 読み込んだ時点のステータスからの遷移を条件付きで保存する
    /// 同じ注文への遷移が競合した場合、後から保存した側はConflictになり在庫も戻さない
    async fn transition(
        &self,
        mut order: Order,
        apply: fn(&mut Order) -> Result<(), DomainError>,
    ) -> Result<Order, ApplicationError> {
        let from = order.status();
        apply(&mut order)?;
        let order_id = order.id();
        let order = self
            .order_repository
            .transition_status(order, from)
            .await?
            .ok_or_else(|| {
                DomainError::conflict(
                    codes::ORDER_STATUS_CHANGED,
                    format!("注文のステータスが他の操作で変更されました: {}", order_id),
                )
            })?;
        let to = order.status();

        let mut context = HashMap::new();
        context.insert("order_id".to_string(), order.id().to_string());
        context.insert("from".to_string(), from.to_string());
        context.insert("to".to_string(), to.to_string());
        self.logger
            .info(COMPONENT, "注文ステータスを変更しました", None, Some(context));

        if matches!(to, OrderStatus::Cancelled | OrderStatus::Failed) {
            let lines: Vec<StockLine> = order
                .items()
                .iter()
                .map(|item| StockLine::new(item.book_id(), item.quantity()))
                .collect();
            // 注文は既に保存済みなので、在庫の戻しに失敗しても遷移は取り消さない
            if let Err(e) = self.inventory_api.increase_stock_batch(&lines).await {
                self.logger.error(
                    COMPONENT,
                    &format!("在庫の戻しに失敗しました: {}", e),
                    None,
                    Some(HashMap::from([("order_id".to_string(), order.id().to_string())])),
                );
                return Err(e);
            }
        }

        let event = DomainEvent::OrderStatusChanged(OrderStatusChanged::new(
            order.id(),
            from,
            to,
            self.clock.now(),
        ));
        if let Err(e) = self.event_publisher.publish(&event) {
            self.logger.warn(
                COMPONENT,
                &format!("{}の発行に失敗しました: {}", event.name(), e),
                None,
                None,
            );
        }

        Ok(order)
    }
}

fn order_not_found(order_id: OrderId) -> DomainError {
    DomainError::not_found(
        codes::ORDER_NOT_FOUND,
        format!("注文が見つかりません: {}", order_id),
    )
}
