use crate::domain::error::{codes, DomainError};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// 注文の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// 新しい一意のOrderIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから OrderId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からOrderIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

/// 書籍の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookId(Uuid);

impl BookId {
    /// 新しい一意のBookIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから BookId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からBookIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

/// 利用者の一意識別子
/// 認証済みの利用者ごとにカートが1つ割り当てられる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// 新しい一意のUserIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから UserId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からUserIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// 金額を表す値オブジェクト
/// 小数点以下2桁に丸めて保持する（四捨五入）。負の金額は作れない
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// 金額を作成
    /// 負の値はエラー
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(
                codes::INVALID_AMOUNT,
                format!("金額は0以上である必要があります: {}", amount),
            ));
        }
        Ok(Self(Self::round(amount)))
    }

    /// 0円
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// 最小単位（1/100）の整数から金額を作成
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// 文字列から金額を作成（設定値の読み込み用）
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let amount = s.trim().parse::<Decimal>().map_err(|e| {
            DomainError::validation(codes::INVALID_AMOUNT, format!("金額の形式が不正です: {}", e))
        })?;
        Self::new(amount)
    }

    /// 金額を取得
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// 金額を加算
    pub fn add(&self, other: &Money) -> Money {
        Money(self.0 + other.0)
    }

    /// 金額を減算
    /// 結果が負になる場合は0で止める
    pub fn saturating_sub(&self, other: &Money) -> Money {
        if other.0 >= self.0 {
            Money::zero()
        } else {
            Money(self.0 - other.0)
        }
    }

    /// 金額を乗算
    pub fn multiply(&self, factor: u32) -> Money {
        Money(self.0 * Decimal::from(factor))
    }

    /// 百分率を適用した金額を計算（例: 10 → 10%）
    pub fn percentage(&self, percent: Decimal) -> Money {
        Money(Self::round(self.0 * percent / Decimal::ONE_HUNDRED))
    }

    fn round(amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// 配送先住所を表す値オブジェクト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    postal_code: String,
    prefecture: String,
    city: String,
    address_line1: String,
    address_line2: Option<String>,
}

impl ShippingAddress {
    /// 新しい配送先住所を作成
    /// バリデーション:
    /// - 郵便番号は7桁の数字である必要がある
    /// - 都道府県、市区町村、住所1は空でない必要がある
    ///
    /// 不正な項目はすべてまとめて返す
    pub fn new(
        postal_code: String,
        prefecture: String,
        city: String,
        address_line1: String,
        address_line2: Option<String>,
    ) -> Result<Self, Vec<DomainError>> {
        let mut errors = Vec::new();

        if !Self::is_valid_postal_code(&postal_code) {
            errors.push(DomainError::validation(
                codes::INVALID_ADDRESS,
                "郵便番号は7桁の数字である必要があります",
            ));
        }
        if prefecture.trim().is_empty() {
            errors.push(DomainError::validation(
                codes::INVALID_ADDRESS,
                "都道府県は空にできません",
            ));
        }
        if city.trim().is_empty() {
            errors.push(DomainError::validation(
                codes::INVALID_ADDRESS,
                "市区町村は空にできません",
            ));
        }
        if address_line1.trim().is_empty() {
            errors.push(DomainError::validation(
                codes::INVALID_ADDRESS,
                "住所1は空にできません",
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // 空白だけの住所2は未指定として扱う
        let address_line2 = address_line2.filter(|line| !line.trim().is_empty());

        Ok(Self {
            postal_code,
            prefecture,
            city,
            address_line1,
            address_line2,
        })
    }

    /// 郵便番号が有効かチェック（7桁の数字）
    fn is_valid_postal_code(postal_code: &str) -> bool {
        postal_code.len() == 7 && postal_code.chars().all(|c| c.is_ascii_digit())
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn prefecture(&self) -> &str {
        &self.prefecture
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn address_line1(&self) -> &str {
        &self.address_line1
    }

    pub fn address_line2(&self) -> Option<&str> {
        self.address_line2.as_deref()
    }
}

/// 注文のステータス
/// Pending → Processing → Shipped → Delivered の順にのみ進む。
/// Cancelled と Failed は Pending / Processing からのみ遷移できる終端状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// 保留中（チェックアウト直後）
    Pending,
    /// 処理中
    Processing,
    /// 発送済み
    Shipped,
    /// 配達完了
    Delivered,
    /// キャンセル済み
    Cancelled,
    /// 失敗（決済失敗など）
    Failed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Failed => "Failed",
        };
        write!(f, "{}", status_str)
    }
}

impl OrderStatus {
    /// 文字列からOrderStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            "Failed" => Ok(OrderStatus::Failed),
            _ => Err(DomainError::validation(
                codes::INVALID_ORDER_STATUS,
                format!("無効な注文ステータス: {}", s),
            )),
        }
    }

    /// 終端状態かどうか
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Failed
        )
    }

    /// 指定したステータスへ遷移できるか
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
                | (Pending, Failed)
                | (Processing, Failed)
        )
    }
}
