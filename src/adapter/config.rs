use crate::domain::model::Money;
use crate::domain::service::PricingPolicy;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 設定エラー
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// 環境変数を読み、未設定ならデフォルト値を使う
fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 環境変数を型に変換する。未設定ならデフォルト値を変換する
fn parse_var<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var_or(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", key, e)))
}

/// データベース接続設定
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// 環境変数から設定を読み取る
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("DATABASE_HOST", "localhost"),
            port: parse_var("DATABASE_PORT", "3306")?,
            database: var_or("DATABASE_NAME", "bookstore_db"),
            username: var_or("DATABASE_USER", "bookstore_user"),
            password: var_or("DATABASE_PASSWORD", "bookstore_password"),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
        })
    }

    /// MySQL接続文字列を生成
    pub fn connection_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// 永続化の実装
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(StorageBackend::MySql),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown backend '{}' (expected mysql or memory)", other)),
        }
    }
}

/// 送料・税額の設定
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub shipping_flat_fee: Money,
    /// Noneなら無料配送なし
    pub free_shipping_threshold: Option<Money>,
    pub tax_rate_percent: Decimal,
}

impl PricingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let shipping_flat_fee = parse_money("SHIPPING_FLAT_FEE", "5.00")?;

        let threshold = var_or("FREE_SHIPPING_THRESHOLD", "100.00");
        let free_shipping_threshold = if threshold.trim().is_empty() {
            None
        } else {
            Some(Money::parse(&threshold).map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid FREE_SHIPPING_THRESHOLD: {}", e))
            })?)
        };

        let tax_rate_percent: Decimal = parse_var("TAX_RATE_PERCENT", "0")?;
        if tax_rate_percent.is_sign_negative() && !tax_rate_percent.is_zero() {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid TAX_RATE_PERCENT: {} is negative",
                tax_rate_percent
            )));
        }

        Ok(Self {
            shipping_flat_fee,
            free_shipping_threshold,
            tax_rate_percent,
        })
    }

    /// 計算ルールを作成
    pub fn policy(&self) -> Result<PricingPolicy, ConfigError> {
        PricingPolicy::new(
            self.shipping_flat_fee,
            self.free_shipping_threshold,
            self.tax_rate_percent,
        )
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }
}

fn parse_money(key: &str, default: &str) -> Result<Money, ConfigError> {
    Money::parse(&var_or(key, default))
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", key, e)))
}

/// アプリケーション全体の設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub server_addr: String,
    pub pricing: PricingConfig,
    pub catalog_cache_ttl: Duration,
}

impl AppConfig {
    /// 環境変数から設定を読み取る
    /// データベース設定は`StorageBackend::MySql`のときだけ別途読む
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage_backend = parse_var("STORAGE_BACKEND", "mysql")?;
        let server_addr = var_or("SERVER_ADDR", "0.0.0.0:3000");
        let pricing = PricingConfig::from_env()?;
        let ttl_secs: u64 = parse_var("CATALOG_CACHE_TTL_SECS", "300")?;

        Ok(Self {
            storage_backend,
            server_addr,
            pricing,
            catalog_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}
