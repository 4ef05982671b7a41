use bookstore_checkout::adapter::driven::{
    AuditedCouponRepository, AuditedOrderRepository, CachedCatalogGateway, InMemoryCartStore,
    InMemoryCatalogGateway, InMemoryCouponRepository, InMemoryOrderRepository,
    InMemoryStockRepository, MySqlCartStore, MySqlCatalogGateway, MySqlCouponRepository,
    MySqlOrderRepository, MySqlStockRepository, SystemClock, TracingEventPublisher, TracingLogger,
};
use bookstore_checkout::adapter::driver::{create_router, AppState};
use bookstore_checkout::adapter::{AppConfig, DatabaseConfig, DatabaseMigration, StorageBackend};
use bookstore_checkout::application::service::{
    CartService, CheckoutService, CouponService, OrderService, StockLedger,
};
use bookstore_checkout::domain::model::{BookId, Money, StockRecord};
use bookstore_checkout::domain::port::{
    BookSnapshot, CartStore, CatalogGateway, Clock, CouponRepository, EventPublisher, Logger,
    OrderRepository, StockRepository,
};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// 永続化アダプターの組
struct Storage {
    cart_store: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogGateway>,
    coupons: Arc<dyn CouponRepository>,
    stocks: Arc<dyn StockRepository>,
    orders: Arc<dyn OrderRepository>,
}

async fn mysql_storage() -> Result<Storage, Box<dyn std::error::Error>> {
    let config = DatabaseConfig::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "データベース設定を読み込みました");

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await?;

    DatabaseMigration::new(pool.clone()).run().await?;

    Ok(Storage {
        cart_store: Arc::new(MySqlCartStore::new(pool.clone())),
        catalog: Arc::new(MySqlCatalogGateway::new(pool.clone())),
        coupons: Arc::new(MySqlCouponRepository::new(pool.clone())),
        stocks: Arc::new(MySqlStockRepository::new(pool.clone())),
        orders: Arc::new(MySqlOrderRepository::new(pool)),
    })
}

/// インメモリ構成
/// 動作確認用に書籍と在庫をいくつか登録しておく
async fn memory_storage() -> Result<Storage, Box<dyn std::error::Error>> {
    let catalog = Arc::new(InMemoryCatalogGateway::new());
    let stocks = Arc::new(InMemoryStockRepository::new());

    let books = [
        ("ドメイン駆動設計入門", 2800),
        ("実践Rustプログラミング", 3600),
        ("データ指向アプリケーション設計", 5200),
    ];
    for (title, cents) in books {
        let book_id = BookId::new();
        catalog
            .add_book(BookSnapshot {
                book_id,
                title: title.to_string(),
                price: Money::from_cents(cents),
            })
            .await;
        stocks.insert(&StockRecord::new(book_id, 10)).await?;
        tracing::info!(%book_id, title, "デモ用の書籍を登録しました");
    }

    Ok(Storage {
        cart_store: Arc::new(InMemoryCartStore::new()),
        catalog,
        coupons: Arc::new(InMemoryCouponRepository::new()),
        stocks,
        orders: Arc::new(InMemoryOrderRepository::new()),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pricing = config.pricing.policy()?;
    tracing::info!(backend = ?config.storage_backend, "設定を読み込みました");

    let storage = match config.storage_backend {
        StorageBackend::MySql => mysql_storage().await?,
        StorageBackend::Memory => memory_storage().await?,
    };

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let publisher: Arc<dyn EventPublisher> = Arc::new(TracingEventPublisher::new());

    // 監査日時とカタログキャッシュはデコレーターで付与する
    let orders: Arc<dyn OrderRepository> =
        Arc::new(AuditedOrderRepository::new(storage.orders, clock.clone()));
    let coupons: Arc<dyn CouponRepository> =
        Arc::new(AuditedCouponRepository::new(storage.coupons, clock.clone()));
    let catalog: Arc<dyn CatalogGateway> = Arc::new(CachedCatalogGateway::new(
        storage.catalog,
        config.catalog_cache_ttl,
    ));

    let stock_ledger = Arc::new(StockLedger::new(storage.stocks, logger.clone()));
    let coupon_service = Arc::new(CouponService::new(coupons, clock.clone(), logger.clone()));

    let app_state = AppState {
        cart_service: Arc::new(CartService::new(
            storage.cart_store.clone(),
            catalog,
            coupon_service.clone(),
            stock_ledger.clone(),
            pricing.clone(),
            logger.clone(),
        )),
        checkout_service: Arc::new(CheckoutService::new(
            storage.cart_store,
            coupon_service.clone(),
            stock_ledger.clone(),
            orders.clone(),
            pricing,
            publisher.clone(),
            clock.clone(),
            logger.clone(),
        )),
        order_service: Arc::new(OrderService::new(
            orders,
            stock_ledger.clone(),
            publisher,
            clock,
            logger,
        )),
        coupon_service,
        stock_ledger,
    };

    let app = create_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!(addr = %config.server_addr, "REST APIサーバーが起動しました");

    axum::serve(listener, app).await?;

    Ok(())
}
