use crate::domain::error::{codes, DomainError};
use crate::domain::model::{
    AuditStamp, Auditable, BookId, Money, OrderId, OrderStatus, ShippingAddress, UserId,
};

/// 注文明細
/// チェックアウト時点の書名・単価のスナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    book_id: BookId,
    title: String,
    unit_price: Money,
    quantity: u32,
}

impl OrderItem {
    /// 新しい注文明細を作成
    /// 数量は1以上である必要がある
    pub fn new(
        book_id: BookId,
        title: String,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation(
                codes::INVALID_QUANTITY,
                "数量は1以上である必要があります",
            ));
        }
        Ok(Self {
            book_id,
            title,
            unit_price,
            quantity,
        })
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// 小計を計算（単価 × 数量）
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// 注文金額の内訳
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    subtotal: Money,
    discount: Money,
    shipping_cost: Money,
    tax: Money,
}

impl OrderTotals {
    /// 内訳を作成
    /// 割引額が小計を超える場合はエラー
    pub fn new(
        subtotal: Money,
        discount: Money,
        shipping_cost: Money,
        tax: Money,
    ) -> Result<Self, DomainError> {
        if discount > subtotal {
            return Err(DomainError::validation(
                codes::INVALID_AMOUNT,
                format!("割引額({})が小計({})を超えています", discount, subtotal),
            ));
        }
        Ok(Self {
            subtotal,
            discount,
            shipping_cost,
            tax,
        })
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    /// 合計 = 小計 − 割引 + 送料 + 税
    pub fn total(&self) -> Money {
        self.subtotal
            .saturating_sub(&self.discount)
            .add(&self.shipping_cost)
            .add(&self.tax)
    }
}

/// Order集約
/// チェックアウト成功時にPendingで作成され、ステータスは前方向にのみ遷移する
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    shipping_address: ShippingAddress,
    status: OrderStatus,
    items: Vec<OrderItem>,
    totals: OrderTotals,
    coupon_code: Option<String>,
    audit: AuditStamp,
}

impl Order {
    /// チェックアウト結果から注文を作成
    /// 初期ステータスはPending
    pub fn place(
        id: OrderId,
        user_id: UserId,
        shipping_address: ShippingAddress,
        items: Vec<OrderItem>,
        totals: OrderTotals,
        coupon_code: Option<String>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::validation(
                codes::CART_EMPTY,
                "注文明細が空です。少なくとも1つの書籍が必要です",
            ));
        }

        Ok(Self {
            id,
            user_id,
            shipping_address,
            status: OrderStatus::Pending,
            items,
            totals,
            coupon_code,
            audit: AuditStamp::default(),
        })
    }

    /// データベースから取得したデータで注文を再構築
    /// リポジトリでの使用を想定
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: OrderId,
        user_id: UserId,
        shipping_address: ShippingAddress,
        status: OrderStatus,
        items: Vec<OrderItem>,
        totals: OrderTotals,
        coupon_code: Option<String>,
        audit: AuditStamp,
    ) -> Self {
        Self {
            id,
            user_id,
            shipping_address,
            status,
            items,
            totals,
            coupon_code,
            audit,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    /// 合計金額
    pub fn total(&self) -> Money {
        self.totals.total()
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn audit(&self) -> AuditStamp {
        self.audit
    }

    /// 処理中にする（Pending → Processing）
    pub fn start_processing(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Processing)
    }

    /// 発送済みにする（Processing → Shipped）
    pub fn mark_as_shipped(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Shipped)
    }

    /// 配達完了にする（Shipped → Delivered）
    pub fn mark_as_delivered(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Delivered)
    }

    /// キャンセルする（Pending / Processing のみ）
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Cancelled)
    }

    /// 失敗にする（Pending / Processing のみ）
    pub fn mark_as_failed(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Failed)
    }

    fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::validation(
                codes::INVALID_ORDER_TRANSITION,
                format!("{}から{}へは遷移できません", self.status, next),
            ));
        }
        self.status = next;
        Ok(())
    }
}

impl Auditable for Order {
    fn audit_stamp_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}
