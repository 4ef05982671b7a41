use crate::application::cancellation::CancellationSignal;
use crate::application::contract::{DiscountApi, InventoryApi, StockLine, ValidateCouponRequest};
use crate::application::ApplicationError;
use crate::domain::error::{codes, DomainError};
use crate::domain::event::{CouponUsageRecordingFailed, DomainEvent, OrderPlaced};
use crate::domain::model::{Money, Order, OrderItem, OrderTotals, ShippingAddress, UserId};
use crate::domain::port::{CartStore, Clock, EventPublisher, Logger, OrderRepository};
use crate::domain::service::PricingPolicy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

const COMPONENT: &str = "CheckoutService";

/// チェックアウトの進行段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    CartLoaded,
    CouponRevalidated,
    StockChecked,
    StockDecremented,
    OrderPersisted,
    CouponUsageRecorded,
    Complete,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            CheckoutStep::CartLoaded => "CartLoaded",
            CheckoutStep::CouponRevalidated => "CouponRevalidated",
            CheckoutStep::StockChecked => "StockChecked",
            CheckoutStep::StockDecremented => "StockDecremented",
            CheckoutStep::OrderPersisted => "OrderPersisted",
            CheckoutStep::CouponUsageRecorded => "CouponUsageRecorded",
            CheckoutStep::Complete => "Complete",
        };
        write!(f, "{}", step)
    }
}

/// チェックアウト結果
/// `warnings`には注文は成立したが後続処理で起きた問題が入る
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub warnings: Vec<String>,
}

/// チェックアウトサービス
/// カート → クーポン再検証 → 在庫確認・減算 → 注文保存 → クーポン利用記録 → カート削除
///
/// 分散トランザクションは使わない。注文保存より前の失敗では在庫を戻し、
/// 注文保存より後の失敗は警告として扱い注文を取り消さない
pub struct CheckoutService {
    cart_store: Arc<dyn CartStore>,
    discount_api: Arc<dyn DiscountApi>,
    inventory_api: Arc<dyn InventoryApi>,
    order_repository: Arc<dyn OrderRepository>,
    pricing: PricingPolicy,
    event_publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cart_store: Arc<dyn CartStore>,
        discount_api: Arc<dyn DiscountApi>,
        inventory_api: Arc<dyn InventoryApi>,
        order_repository: Arc<dyn OrderRepository>,
        pricing: PricingPolicy,
        event_publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            cart_store,
            discount_api,
            inventory_api,
            order_repository,
            pricing,
            event_publisher,
            clock,
            logger,
        }
    }

    /// カートの内容で注文を確定する
    ///
    /// # Arguments
    /// * `user_id` - ユーザーID
    /// * `shipping_address` - 配送先住所
    /// * `cancellation` - 各ストレージ操作の前に確認するキャンセル信号
    ///
    /// # Returns
    /// * `Ok(CheckoutReceipt)` - 作成された注文と警告
    /// * `Err(ApplicationError)` - いずれかの段階で失敗。在庫は元に戻っている
    pub async fn checkout(
        &self,
        user_id: UserId,
        shipping_address: ShippingAddress,
        cancellation: &CancellationSignal,
    ) -> Result<CheckoutReceipt, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        self.logger.info(
            COMPONENT,
            "チェックアウトを開始します",
            Some(correlation_id),
            Some(HashMap::from([("user_id".to_string(), user_id.to_string())])),
        );

        let result = self
            .run(user_id, shipping_address, cancellation, correlation_id)
            .await;

        if let Err(e) = &result {
            self.logger.warn(
                COMPONENT,
                &format!("チェックアウトに失敗しました: {}", e),
                Some(correlation_id),
                Some(HashMap::from([
                    ("user_id".to_string(), user_id.to_string()),
                    ("code".to_string(), e.code().to_string()),
                ])),
            );
        }
        result
    }

    async fn run(
        &self,
        user_id: UserId,
        shipping_address: ShippingAddress,
        cancellation: &CancellationSignal,
        correlation_id: Uuid,
    ) -> Result<CheckoutReceipt, ApplicationError> {
        cancellation.check()?;
        let cart = match self.cart_store.load(user_id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => {
                return Err(DomainError::validation(
                    codes::CART_EMPTY,
                    "カートが空です",
                )
                .into())
            }
        };
        self.step(CheckoutStep::CartLoaded, correlation_id);

        // カートに保存された割引額は使わず、必ず再計算する
        let subtotal = cart.subtotal();
        let discount = match cart.coupon_code() {
            Some(code) => {
                cancellation.check()?;
                self.discount_api
                    .validate_coupon(ValidateCouponRequest {
                        code: code.to_string(),
                        subtotal,
                    })
                    .await?
                    .discount
            }
            None => Money::zero(),
        };
        self.step(CheckoutStep::CouponRevalidated, correlation_id);

        let discounted = subtotal.saturating_sub(&discount);
        let totals = OrderTotals::new(
            subtotal,
            discount,
            self.pricing.shipping_cost(discounted),
            self.pricing.tax(discounted),
        )?;
        let items = cart
            .items()
            .iter()
            .map(|item| {
                OrderItem::new(
                    item.book_id(),
                    item.title().to_string(),
                    item.unit_price(),
                    item.quantity(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let order = Order::place(
            self.order_repository.next_identity(),
            user_id,
            shipping_address,
            items,
            totals,
            cart.coupon_code().map(str::to_string),
        )?;
        let lines: Vec<StockLine> = cart
            .items()
            .iter()
            .map(|item| StockLine::new(item.book_id(), item.quantity()))
            .collect();

        cancellation.check()?;
        self.inventory_api.check_stock(&lines).await?;
        self.step(CheckoutStep::StockChecked, correlation_id);

        cancellation.check()?;
        self.inventory_api.decrease_stock_batch(&lines).await?;
        self.step(CheckoutStep::StockDecremented, correlation_id);

        if let Err(e) = cancellation.check() {
            self.restock(&lines, correlation_id).await;
            return Err(e.into());
        }
        let order = match self.order_repository.save(order).await {
            Ok(order) => order,
            Err(e) => {
                self.logger.error(
                    COMPONENT,
                    &format!("注文の保存に失敗しました: {}", e),
                    Some(correlation_id),
                    None,
                );
                self.restock(&lines, correlation_id).await;
                return Err(e.into());
            }
        };
        self.step(CheckoutStep::OrderPersisted, correlation_id);

        // ここから先は注文を取り消さない
        let mut warnings = Vec::new();

        if let Some(code) = order.coupon_code() {
            match self.discount_api.record_usage(code).await {
                Ok(()) => self.step(CheckoutStep::CouponUsageRecorded, correlation_id),
                Err(e) => {
                    let warning = format!("クーポンの利用記録に失敗しました（{}）: {}", code, e);
                    self.logger.warn(COMPONENT, &warning, Some(correlation_id), None);
                    self.publish(
                        DomainEvent::CouponUsageRecordingFailed(CouponUsageRecordingFailed::new(
                            order.id(),
                            code.to_string(),
                            e.to_string(),
                            self.clock.now(),
                        )),
                        correlation_id,
                    );
                    warnings.push(warning);
                }
            }
        }

        if let Err(e) = self.cart_store.delete(user_id).await {
            let warning = format!("カートの削除に失敗しました: {}", e);
            self.logger.warn(COMPONENT, &warning, Some(correlation_id), None);
            warnings.push(warning);
        }

        self.publish(
            DomainEvent::OrderPlaced(OrderPlaced::new(&order, self.clock.now())),
            correlation_id,
        );

        self.logger.info(
            COMPONENT,
            &format!("チェックアウトが完了しました（{}）", CheckoutStep::Complete),
            Some(correlation_id),
            Some(HashMap::from([
                ("order_id".to_string(), order.id().to_string()),
                ("total".to_string(), order.total().to_string()),
            ])),
        );

        Ok(CheckoutReceipt { order, warnings })
    }

    fn step(&self, step: CheckoutStep, correlation_id: Uuid) {
        self.logger.debug(
            COMPONENT,
            &format!("step: {}", step),
            Some(correlation_id),
            None,
        );
    }

    async fn restock(&self, lines: &[StockLine], correlation_id: Uuid) {
        if let Err(e) = self.inventory_api.increase_stock_batch(lines).await {
            self.logger.error(
                COMPONENT,
                &format!("在庫の補償に失敗しました: {}", e),
                Some(correlation_id),
                None,
            );
        }
    }

    fn publish(&self, event: DomainEvent, correlation_id: Uuid) {
        if let Err(e) = self.event_publisher.publish(&event) {
            self.logger.warn(
                COMPONENT,
                &format!("{}の発行に失敗しました: {}", event.name(), e),
                Some(correlation_id),
                None,
            );
        }
    }
}
