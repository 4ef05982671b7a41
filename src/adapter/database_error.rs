use crate::domain::port::RepositoryError;

/// データベースエラー型
/// データベース操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    /// データベース接続エラー
    #[error("Database connection error: {0}")]
    ConnectionError(String),
    /// SQLクエリエラー
    #[error("Database query error: {0}")]
    QueryError(String),
    /// 一意制約違反
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    /// マイグレーションエラー
    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl DatabaseError {
    /// sqlxのエラーを分類し、`context`を添えて変換する
    pub fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::DuplicateKey(format!("{}: {}", context, err))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(format!("{}: {}", context, err))
            }
            _ => DatabaseError::QueryError(format!("{}: {}", context, err)),
        }
    }
}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::DuplicateKey(msg) => RepositoryError::DuplicateKey(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
        }
    }
}

/// クエリ結果のエラーをRepositoryErrorに変換する
pub fn query_error(context: &'static str) -> impl Fn(sqlx::Error) -> RepositoryError {
    move |e| RepositoryError::from(DatabaseError::from_sqlx(context, e))
}

/// 行の値を解釈できなかったときのエラー
pub fn decode_error(context: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::FetchFailed(format!("{}: {}", context, err))
}
