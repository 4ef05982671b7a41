use crate::domain::error::{codes, DomainError};
use crate::domain::model::{BookId, Money, UserId};
use serde::{Deserialize, Serialize};

/// カート明細
/// 追加時点の書名・単価をスナップショットとして保持する
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    book_id: BookId,
    title: String,
    unit_price: Money,
    quantity: u32,
}

impl CartItem {
    /// 新しいカート明細を作成
    /// 数量は1以上である必要がある
    pub fn new(
        book_id: BookId,
        title: String,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(invalid_quantity());
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

/// カート集約
/// 利用者IDをキーとしてキーバリューストアに保存される。
/// 不変条件: 割引額は小計を超えない
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
    coupon_code: Option<String>,
    discount: Money,
    shipping_cost: Money,
    tax: Money,
}

impl Cart {
    /// 空のカートを作成
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            coupon_code: None,
            discount: Money::zero(),
            shipping_cost: Money::zero(),
            tax: Money::zero(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
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

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 指定した書籍の数量（カートにない場合は0）
    pub fn quantity_of(&self, book_id: BookId) -> u32 {
        self.items
            .iter()
            .find(|item| item.book_id == book_id)
            .map(|item| item.quantity)
            .unwrap_or(0)
    }

    /// 小計 = Σ(単価 × 数量)
    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, item| acc.add(&item.subtotal()))
    }

    /// 割引後の小計
    pub fn discounted_subtotal(&self) -> Money {
        self.subtotal().saturating_sub(&self.discount)
    }

    /// 最終金額 = 小計 − 割引 + 送料 + 税
    pub fn total(&self) -> Money {
        self.discounted_subtotal()
            .add(&self.shipping_cost)
            .add(&self.tax)
    }

    /// 書籍をカートに追加
    /// 同じ書籍が既にある場合は数量を加算し、書名・単価を最新の値に更新する
    pub fn add_item(
        &mut self,
        book_id: BookId,
        title: String,
        unit_price: Money,
        quantity: u32,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(invalid_quantity());
        }

        if let Some(existing) = self.items.iter_mut().find(|item| item.book_id == book_id) {
            existing.quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or_else(quantity_overflow)?;
            existing.title = title;
            existing.unit_price = unit_price;
        } else {
            self.items
                .push(CartItem::new(book_id, title, unit_price, quantity)?);
        }

        self.clamp_discount();
        Ok(())
    }

    /// 明細の数量を変更
    pub fn update_quantity(&mut self, book_id: BookId, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(invalid_quantity());
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.book_id == book_id)
            .ok_or_else(|| item_not_found(book_id))?;
        item.quantity = quantity;

        self.clamp_discount();
        Ok(())
    }

    /// 明細を削除
    pub fn remove_item(&mut self, book_id: BookId) -> Result<(), DomainError> {
        let before = self.items.len();
        self.items.retain(|item| item.book_id != book_id);
        if self.items.len() == before {
            return Err(item_not_found(book_id));
        }

        self.clamp_discount();
        Ok(())
    }

    /// クーポンを適用
    /// 割引額は小計を上限とする
    pub fn apply_coupon(&mut self, code: String, discount: Money) {
        self.coupon_code = Some(code);
        self.discount = discount;
        self.clamp_discount();
    }

    /// 適用中のクーポンの割引額だけを更新する
    pub fn update_discount(&mut self, discount: Money) {
        if self.coupon_code.is_some() {
            self.discount = discount;
            self.clamp_discount();
        }
    }

    /// クーポンを取り外す（常に成功）
    pub fn remove_coupon(&mut self) {
        self.coupon_code = None;
        self.discount = Money::zero();
    }

    /// 送料と税額を設定
    pub fn set_charges(&mut self, shipping_cost: Money, tax: Money) {
        self.shipping_cost = shipping_cost;
        self.tax = tax;
    }

    fn clamp_discount(&mut self) {
        let subtotal = self.subtotal();
        if self.discount > subtotal {
            self.discount = subtotal;
        }
    }
}

fn invalid_quantity() -> DomainError {
    DomainError::validation(codes::INVALID_QUANTITY, "数量は1以上である必要があります")
}

fn quantity_overflow() -> DomainError {
    DomainError::validation(codes::INVALID_QUANTITY, "数量が上限を超えています")
}

fn item_not_found(book_id: BookId) -> DomainError {
    DomainError::not_found(
        codes::CART_ITEM_NOT_FOUND,
        format!("カートに書籍がありません: {}", book_id),
    )
}
