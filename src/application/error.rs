use crate::domain::error::{codes, DomainError, ErrorKind};
use crate::domain::port::RepositoryError;

/// アプリケーション層のエラー型
/// ドメインエラー（単体・複数）とリポジトリエラーをラップする
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// ドメインエラー（ビジネスルール違反）
    #[error("Domain error: {0}")]
    Domain(DomainError),
    /// まとめて報告するドメインエラー
    #[error("{} errors, first: {}", .0.len(), first_message(.0))]
    Aggregate(Vec<DomainError>),
    /// リポジトリエラー（永続化の失敗）
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

fn first_message(errors: &[DomainError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_default()
}

impl ApplicationError {
    /// 複数のエラーから作成する。1件だけなら単体のエラーにする
    pub fn from_errors(mut errors: Vec<DomainError>) -> Self {
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return ApplicationError::Domain(error);
            }
        }
        ApplicationError::Aggregate(errors)
    }

    /// 代表するエラー種別
    /// 複数の場合は先頭のエラーの種別
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(err) => err.kind(),
            ApplicationError::Aggregate(errors) => errors
                .first()
                .map(DomainError::kind)
                .unwrap_or(ErrorKind::Unexpected),
            ApplicationError::Repository(RepositoryError::DuplicateKey(_)) => ErrorKind::Conflict,
            ApplicationError::Repository(_) => ErrorKind::Unexpected,
        }
    }

    /// 含まれるすべてのドメインエラー
    /// リポジトリエラーはUnexpectedのドメインエラーとして返す
    pub fn errors(&self) -> Vec<DomainError> {
        match self {
            ApplicationError::Domain(err) => vec![err.clone()],
            ApplicationError::Aggregate(errors) => errors.clone(),
            ApplicationError::Repository(RepositoryError::DuplicateKey(msg)) => {
                vec![DomainError::conflict(codes::STORAGE_FAILURE, msg.clone())]
            }
            ApplicationError::Repository(err) => {
                vec![DomainError::unexpected(codes::STORAGE_FAILURE, err.to_string())]
            }
        }
    }

    /// 先頭のエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            ApplicationError::Domain(err) => err.code(),
            ApplicationError::Aggregate(errors) => errors
                .first()
                .map(DomainError::code)
                .unwrap_or(codes::STORAGE_FAILURE),
            ApplicationError::Repository(_) => codes::STORAGE_FAILURE,
        }
    }

    /// 指定したコードのエラーを含むか
    pub fn has_code(&self, code: &str) -> bool {
        self.errors().iter().any(|e| e.code() == code)
    }
}

// From実装でエラー変換を簡潔に
impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        ApplicationError::Domain(err)
    }
}

impl From<Vec<DomainError>> for ApplicationError {
    fn from(errors: Vec<DomainError>) -> Self {
        ApplicationError::from_errors(errors)
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        ApplicationError::Repository(err)
    }
}
