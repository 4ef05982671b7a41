// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::event::DomainEvent;
use crate::domain::model::{
    BookId, Cart, Coupon, Money, Order, OrderId, OrderStatus, StockRecord, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    ConnectionFailed(String),
    /// 操作に失敗
    OperationFailed(String),
    /// データの取得に失敗
    FetchFailed(String),
    /// 一意キーの重複
    DuplicateKey(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RepositoryError::OperationFailed(msg) => write!(f, "Operation failed: {}", msg),
            RepositoryError::FetchFailed(msg) => write!(f, "Fetch failed: {}", msg),
            RepositoryError::DuplicateKey(msg) => write!(f, "Duplicate key: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// カートストア
/// ユーザーごとのカートをキー・バリューで保持する。後勝ち
#[async_trait]
pub trait CartStore: Send + Sync {
    /// カートを読み込む（存在しなければNone）
    async fn load(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// カートを保存する（上書き）
    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError>;

    /// カートを削除する。存在しなくても成功
    async fn delete(&self, user_id: UserId) -> Result<(), RepositoryError>;
}

/// クーポン利用回数の条件付き加算の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageIncrement {
    /// 加算した
    Recorded,
    /// 上限に達していたので加算しなかった
    LimitReached,
    /// クーポンが存在しない
    NotFound,
}

/// クーポンリポジトリトレイト
#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// コードでクーポンを検索する（大文字小文字を区別）
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError>;

    /// クーポンを登録する
    ///
    /// # Returns
    /// * `Ok(Coupon)` - 保存された状態のクーポン
    /// * `Err(RepositoryError::DuplicateKey)` - 同じコードが既に存在する
    async fn insert(&self, coupon: Coupon) -> Result<Coupon, RepositoryError>;

    /// 上限未満の場合に限り利用回数を1増やし、更新日時を`at`にする
    /// 確認と加算はストレージ上で不可分に行うこと
    async fn increment_usage_if_available(
        &self,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<UsageIncrement, RepositoryError>;
}

/// 在庫の条件付き減算の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    /// 減算した
    Applied,
    /// 在庫不足のため何も変更していない
    Insufficient { available: u32 },
    /// 在庫レコードが存在しない
    NotFound,
}

/// 在庫リポジトリトレイト
/// 在庫数の変更は条件付き更新でのみ行う
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// 書籍IDで在庫を検索する
    async fn find_by_book_id(
        &self,
        book_id: BookId,
    ) -> Result<Option<StockRecord>, RepositoryError>;

    /// 在庫レコードを登録する
    /// 同じ書籍IDが既に存在する場合は`DuplicateKey`
    async fn insert(&self, stock: &StockRecord) -> Result<(), RepositoryError>;

    /// 在庫数が`quantity`以上の場合に限り減算する
    async fn decrease_if_available(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<StockAdjustment, RepositoryError>;

    /// 在庫数を加算する
    ///
    /// # Returns
    /// * `Ok(true)` - 加算した
    /// * `Ok(false)` - 在庫レコードが存在しない
    async fn increase(&self, book_id: BookId, quantity: u32) -> Result<bool, RepositoryError>;

    /// すべての在庫を取得する
    /// 書籍IDの昇順で並べて返す
    async fn find_all(&self) -> Result<Vec<StockRecord>, RepositoryError>;

    /// 指定された最大在庫数以下の在庫を取得する
    /// 書籍IDの昇順で並べて返す
    async fn find_by_max_quantity(
        &self,
        max_quantity: u32,
    ) -> Result<Vec<StockRecord>, RepositoryError>;
}

/// 注文リポジトリトレイト
/// 注文集約の永続化を抽象化する
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 注文を保存する（新規・更新の両方）
    ///
    /// # Returns
    /// * `Ok(Order)` - 保存された状態の注文
    /// * `Err(RepositoryError)` - 保存失敗
    async fn save(&self, order: Order) -> Result<Order, RepositoryError>;

    /// 保存済みのステータスが`from`のままである場合に限り、ステータスと更新日時を書き換える
    /// 確認と更新はストレージ上で不可分に行うこと
    ///
    /// # Returns
    /// * `Ok(Some(Order))` - 書き換えた
    /// * `Ok(None)` - ステータスが既に変わっていた、または注文が存在しない
    async fn transition_status(
        &self,
        order: Order,
        from: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError>;

    /// 注文IDで注文を検索する
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// ユーザーの注文を取得する
    /// 作成日時の降順で並べて返す
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// 指定されたステータスの注文を取得する
    /// 作成日時の降順で並べて返す
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError>;

    /// 新しい一意の注文IDを生成する
    fn next_identity(&self) -> OrderId;
}

/// カタログ上の書籍情報
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    pub book_id: BookId,
    pub title: String,
    pub price: Money,
}

/// カタログゲートウェイ
/// カートに書名・単価のスナップショットを載せるための読み取り専用ポート
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn find_book(&self, book_id: BookId) -> Result<Option<BookSnapshot>, RepositoryError>;
}

/// イベント発行エラー
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("Event publishing failed: {0}")]
    PublishingFailed(String),
}

/// イベント発行者トレイト
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError>;
}

/// 時計
/// 監査日時やクーポン有効期限の判定に使う
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
