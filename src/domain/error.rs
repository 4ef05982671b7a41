use serde::Serialize;

/// エラーの分類
/// HTTPステータスへの対応付けや、呼び出し側での分岐に使う
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// 入力の形式・範囲が不正
    Validation,
    /// エンティティが存在しない（期限切れ・無効なクーポンの隠蔽にも使う）
    NotFound,
    /// 一意制約違反、または競合する更新
    Conflict,
    /// ビジネスルール違反（在庫不足など）
    Failure,
    /// 想定外の障害（ストレージ・インフラ）
    Unexpected,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ErrorKind::Validation => "Validation",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Failure => "Failure",
            ErrorKind::Unexpected => "Unexpected",
        };
        write!(f, "{}", kind)
    }
}

/// ドメイン層のエラー型
/// 種別ごとに機械可読なコードと人間向けのメッセージを持つ
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("{code}: {message}")]
    Validation { code: &'static str, message: String },
    #[error("{code}: {message}")]
    NotFound { code: &'static str, message: String },
    #[error("{code}: {message}")]
    Conflict { code: &'static str, message: String },
    #[error("{code}: {message}")]
    Failure { code: &'static str, message: String },
    #[error("{code}: {message}")]
    Unexpected { code: &'static str, message: String },
}

impl DomainError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        DomainError::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        DomainError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn failure(code: &'static str, message: impl Into<String>) -> Self {
        DomainError::Failure {
            code,
            message: message.into(),
        }
    }

    pub fn unexpected(code: &'static str, message: impl Into<String>) -> Self {
        DomainError::Unexpected {
            code,
            message: message.into(),
        }
    }

    /// エラー種別を取得
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation { .. } => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Conflict { .. } => ErrorKind::Conflict,
            DomainError::Failure { .. } => ErrorKind::Failure,
            DomainError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// 機械可読なエラーコードを取得
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { code, .. }
            | DomainError::NotFound { code, .. }
            | DomainError::Conflict { code, .. }
            | DomainError::Failure { code, .. }
            | DomainError::Unexpected { code, .. } => *code,
        }
    }

    /// メッセージを取得
    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation { message, .. }
            | DomainError::NotFound { message, .. }
            | DomainError::Conflict { message, .. }
            | DomainError::Failure { message, .. }
            | DomainError::Unexpected { message, .. } => message,
        }
    }
}

/// エラーコード定義
/// レスポンスの`code`フィールドにそのまま出る値なので変更しないこと
pub mod codes {
    pub const INVALID_QUANTITY: &str = "General.InvalidQuantity";
    pub const INVALID_AMOUNT: &str = "General.InvalidAmount";
    pub const INVALID_VALUE: &str = "General.InvalidValue";
    pub const REQUEST_CANCELLED: &str = "General.RequestCancelled";
    pub const STORAGE_FAILURE: &str = "General.StorageFailure";

    pub const CART_EMPTY: &str = "Cart.EmptyCart";
    pub const CART_ITEM_NOT_FOUND: &str = "Cart.ItemNotFound";

    pub const BOOK_NOT_FOUND: &str = "Catalog.BookNotFound";

    pub const COUPON_NOT_FOUND: &str = "Coupon.NotFound";
    pub const COUPON_MINIMUM_NOT_MET: &str = "Coupon.MinimumCartAmountNotMet";
    pub const COUPON_INVALID: &str = "Coupon.Invalid";
    pub const COUPON_DUPLICATE: &str = "Coupon.Duplicate";
    pub const COUPON_USAGE_LIMIT_REACHED: &str = "Coupon.UsageLimitReached";

    pub const STOCK_NOT_FOUND: &str = "Inventory.NotFound";
    pub const STOCK_DUPLICATE: &str = "Inventory.Duplicate";
    pub const INSUFFICIENT_STOCK: &str = "Inventory.InsufficientStock";

    pub const ORDER_NOT_FOUND: &str = "Order.NotFound";
    pub const INVALID_ORDER_TRANSITION: &str = "Order.InvalidStatusTransition";
    pub const INVALID_ORDER_STATUS: &str = "Order.InvalidStatus";
    pub const ORDER_STATUS_CHANGED: &str = "Order.StatusChangedConcurrently";
    pub const INVALID_ADDRESS: &str = "Order.InvalidShippingAddress";
}
