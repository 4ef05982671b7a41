use bookstore_checkout::adapter::driven::{
    InMemoryCartStore, InMemoryCatalogGateway, InMemoryCouponRepository, InMemoryEventPublisher,
    InMemoryOrderRepository, InMemoryStockRepository, SystemClock, TracingLogger,
};
use bookstore_checkout::application::cancellation::CancellationSignal;
use bookstore_checkout::application::contract::{
    CouponQuote, DiscountApi, InventoryApi, StockLine, ValidateCouponRequest,
};
use bookstore_checkout::application::service::{
    CartService, CheckoutService, CouponService, OrderService, StockLedger,
};
use bookstore_checkout::application::ApplicationError;
use bookstore_checkout::domain::error::{codes, ErrorKind};
use bookstore_checkout::domain::event::DomainEvent;
use bookstore_checkout::domain::model::{
    BookId, DiscountType, Money, NewCoupon, Order, OrderStatus, ShippingAddress, UserId,
};
use bookstore_checkout::domain::port::{BookSnapshot, CartStore, CouponRepository, Logger};
use bookstore_checkout::domain::service::PricingPolicy;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// 別のチェックアウトに先を越された状況を再現する割引窓口
/// 検証直後に利用枠を消費してしまう
struct RacingDiscountApi {
    inner: Arc<CouponService>,
    coupons: Arc<InMemoryCouponRepository>,
}

#[async_trait]
impl DiscountApi for RacingDiscountApi {
    async fn validate_coupon(
        &self,
        request: ValidateCouponRequest,
    ) -> Result<CouponQuote, ApplicationError> {
        let code = request.code.clone();
        let quote = self.inner.validate_coupon(request).await?;
        self.coupons
            .increment_usage_if_available(&code, Utc::now())
            .await?;
        Ok(quote)
    }

    async fn record_usage(&self, code: &str) -> Result<(), ApplicationError> {
        self.inner.record_usage(code).await
    }
}

struct TestContext {
    cart_service: CartService,
    checkout_service: CheckoutService,
    order_service: OrderService,
    coupon_service: Arc<CouponService>,
    stock_ledger: Arc<StockLedger>,
    carts: Arc<InMemoryCartStore>,
    coupons: Arc<InMemoryCouponRepository>,
    publisher: Arc<InMemoryEventPublisher>,
    book_id: BookId,
}

impl TestContext {
    /// 単価20.00の書籍を1冊、在庫`stock`で登録した環境を作る
    async fn new(stock: u32) -> Self {
        Self::build(stock, false).await
    }

    /// チェックアウト時のクーポン検証直後に利用枠が消費される環境
    async fn with_racing_coupons(stock: u32) -> Self {
        Self::build(stock, true).await
    }

    async fn build(stock: u32, racing: bool) -> Self {
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
        let clock = Arc::new(SystemClock);
        let pricing = PricingPolicy::default();

        let catalog = Arc::new(InMemoryCatalogGateway::new());
        let carts = Arc::new(InMemoryCartStore::new());
        let coupons = Arc::new(InMemoryCouponRepository::new());
        let stocks = Arc::new(InMemoryStockRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let publisher = Arc::new(InMemoryEventPublisher::new());

        let stock_ledger = Arc::new(StockLedger::new(stocks, logger.clone()));
        let coupon_service = Arc::new(CouponService::new(
            coupons.clone(),
            clock.clone(),
            logger.clone(),
        ));
        let checkout_discounts: Arc<dyn DiscountApi> = if racing {
            Arc::new(RacingDiscountApi {
                inner: coupon_service.clone(),
                coupons: coupons.clone(),
            })
        } else {
            coupon_service.clone()
        };

        let book_id = BookId::new();
        catalog
            .add_book(BookSnapshot {
                book_id,
                title: "Rustで学ぶ設計".to_string(),
                price: Money::new(dec!(20.00)).unwrap(),
            })
            .await;
        stock_ledger.create_stock(book_id, stock).await.unwrap();

        Self {
            cart_service: CartService::new(
                carts.clone(),
                catalog,
                coupon_service.clone(),
                stock_ledger.clone(),
                pricing.clone(),
                logger.clone(),
            ),
            checkout_service: CheckoutService::new(
                carts.clone(),
                checkout_discounts,
                stock_ledger.clone(),
                orders.clone(),
                pricing,
                publisher.clone(),
                clock.clone(),
                logger.clone(),
            ),
            order_service: OrderService::new(
                orders,
                stock_ledger.clone(),
                publisher.clone(),
                clock,
                logger,
            ),
            coupon_service,
            stock_ledger,
            carts,
            coupons,
            publisher,
            book_id,
        }
    }

    async fn create_coupon(&self, code: &str, usage_limit: u32) {
        self.coupon_service
            .create_coupon(NewCoupon {
                code: code.to_string(),
                discount_type: DiscountType::Percentage,
                value: Decimal::from(10),
                expiry_date: None,
                usage_limit,
                minimum_cart_amount: Money::new(dec!(50)).unwrap(),
                is_active: true,
            })
            .await
            .unwrap();
    }

    async fn stock(&self) -> u32 {
        self.stock_ledger
            .get_stock(self.book_id)
            .await
            .unwrap()
            .quantity()
    }

    async fn usage_count(&self, code: &str) -> u32 {
        self.coupons
            .find_by_code(code)
            .await
            .unwrap()
            .unwrap()
            .usage_count()
    }

    async fn checkout(&self, user_id: UserId) -> Result<Order, ApplicationError> {
        self.checkout_service
            .checkout(user_id, address(), &CancellationSignal::none())
            .await
            .map(|receipt| receipt.order)
    }
}

fn address() -> ShippingAddress {
    ShippingAddress::new(
        "1500043".to_string(),
        "東京都".to_string(),
        "渋谷区".to_string(),
        "道玄坂1-2-3".to_string(),
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn test_checkout_with_coupon_places_order() {
    let ctx = TestContext::new(10).await;
    ctx.create_coupon("SPRING10", 0).await;
    let user_id = UserId::new();

    ctx.cart_service
        .add_item(user_id, ctx.book_id, 3)
        .await
        .unwrap();
    let cart = ctx
        .cart_service
        .apply_coupon(user_id, "SPRING10")
        .await
        .unwrap();

    assert_eq!(cart.subtotal(), Money::new(dec!(60.00)).unwrap());
    assert_eq!(cart.discount(), Money::new(dec!(6.00)).unwrap());
    // 割引後54.00は送料無料の基準に届かない
    assert_eq!(cart.shipping_cost(), Money::new(dec!(5.00)).unwrap());
    assert_eq!(cart.total(), Money::new(dec!(59.00)).unwrap());

    let receipt = ctx
        .checkout_service
        .checkout(user_id, address(), &CancellationSignal::none())
        .await
        .unwrap();

    assert!(receipt.warnings.is_empty());
    let order = receipt.order;
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.items().len(), 1);
    assert_eq!(order.coupon_code(), Some("SPRING10"));
    assert_eq!(order.totals().discount(), Money::new(dec!(6.00)).unwrap());
    assert_eq!(order.total(), Money::new(dec!(59.00)).unwrap());

    assert_eq!(ctx.stock().await, 7);
    assert_eq!(ctx.usage_count("SPRING10").await, 1);
    assert!(ctx.carts.load(user_id).await.unwrap().is_none());

    let stored = ctx.order_service.get_order(order.id()).await.unwrap();
    assert_eq!(stored.total(), order.total());

    let events = ctx.publisher.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], DomainEvent::OrderPlaced(_)));
}

#[tokio::test]
async fn test_checkout_insufficient_stock_changes_nothing() {
    let ctx = TestContext::new(5).await;
    ctx.create_coupon("SPRING10", 0).await;
    let user_id = UserId::new();

    ctx.cart_service
        .add_item(user_id, ctx.book_id, 5)
        .await
        .unwrap();
    ctx.cart_service
        .apply_coupon(user_id, "SPRING10")
        .await
        .unwrap();
    // カート投入後に在庫が減った
    ctx.stock_ledger.decrease_stock(ctx.book_id, 3).await.unwrap();

    let error = ctx.checkout(user_id).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Failure);
    assert!(error.has_code(codes::INSUFFICIENT_STOCK));
    assert_eq!(ctx.stock().await, 2);
    assert_eq!(ctx.usage_count("SPRING10").await, 0);
    assert!(ctx
        .order_service
        .list_orders_for_user(user_id)
        .await
        .unwrap()
        .is_empty());

    let cart = ctx.carts.load(user_id).await.unwrap().unwrap();
    assert_eq!(cart.quantity_of(ctx.book_id), 5);
    assert_eq!(cart.coupon_code(), Some("SPRING10"));
    assert!(ctx.publisher.events().is_empty());
}

#[tokio::test]
async fn test_checkout_empty_cart() {
    let ctx = TestContext::new(10).await;
    let user_id = UserId::new();

    let error = ctx.checkout(user_id).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(error.code(), codes::CART_EMPTY);
    assert_eq!(ctx.stock().await, 10);
    assert!(ctx.publisher.events().is_empty());
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let ctx = TestContext::new(5).await;
    let first = UserId::new();
    let second = UserId::new();

    ctx.cart_service.add_item(first, ctx.book_id, 3).await.unwrap();
    ctx.cart_service
        .add_item(second, ctx.book_id, 3)
        .await
        .unwrap();

    let (a, b) = tokio::join!(ctx.checkout(first), ctx.checkout(second));

    let succeeded = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    let failed = if a.is_err() { a } else { b };
    assert!(failed.unwrap_err().has_code(codes::INSUFFICIENT_STOCK));
    assert_eq!(ctx.stock().await, 2);
}

#[tokio::test]
async fn test_exhausted_coupon_rejected_at_checkout() {
    let ctx = TestContext::new(10).await;
    ctx.create_coupon("ONCE", 1).await;
    let user_id = UserId::new();

    ctx.cart_service
        .add_item(user_id, ctx.book_id, 3)
        .await
        .unwrap();
    ctx.cart_service.apply_coupon(user_id, "ONCE").await.unwrap();
    // 適用後に別の注文で使い切られた
    ctx.coupon_service.record_usage("ONCE").await.unwrap();

    let error = ctx.checkout(user_id).await.unwrap_err();

    assert_eq!(error.code(), codes::COUPON_NOT_FOUND);
    assert_eq!(ctx.stock().await, 10);
    assert_eq!(ctx.usage_count("ONCE").await, 1);
    assert!(ctx.carts.load(user_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_coupon_usage_race_keeps_order_with_warning() {
    let ctx = TestContext::with_racing_coupons(10).await;
    ctx.create_coupon("LAST1", 1).await;
    let user_id = UserId::new();

    ctx.cart_service
        .add_item(user_id, ctx.book_id, 3)
        .await
        .unwrap();
    ctx.cart_service
        .apply_coupon(user_id, "LAST1")
        .await
        .unwrap();

    let receipt = ctx
        .checkout_service
        .checkout(user_id, address(), &CancellationSignal::none())
        .await
        .unwrap();

    assert_eq!(receipt.warnings.len(), 1);
    assert_eq!(receipt.order.coupon_code(), Some("LAST1"));
    assert_eq!(ctx.stock().await, 7);
    // 上限を超えて記録されることはない
    assert_eq!(ctx.usage_count("LAST1").await, 1);

    let events = ctx.publisher.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::CouponUsageRecordingFailed(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::OrderPlaced(_))));
}

#[tokio::test]
async fn test_cancelled_checkout_restores_nothing_taken() {
    let ctx = TestContext::new(10).await;
    let user_id = UserId::new();
    ctx.cart_service
        .add_item(user_id, ctx.book_id, 2)
        .await
        .unwrap();

    let (handle, signal) = CancellationSignal::new();
    handle.cancel();
    let error = ctx
        .checkout_service
        .checkout(user_id, address(), &signal)
        .await
        .unwrap_err();

    assert_eq!(error.code(), codes::REQUEST_CANCELLED);
    assert_eq!(ctx.stock().await, 10);
    assert!(ctx.carts.load(user_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_cancel_order_restocks() {
    let ctx = TestContext::new(10).await;
    let user_id = UserId::new();
    ctx.cart_service
        .add_item(user_id, ctx.book_id, 4)
        .await
        .unwrap();
    let order = ctx.checkout(user_id).await.unwrap();
    assert_eq!(ctx.stock().await, 6);

    let cancelled = ctx
        .order_service
        .cancel_order(user_id, order.id())
        .await
        .unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(ctx.stock().await, 10);
    assert!(ctx
        .publisher
        .events()
        .iter()
        .any(|e| matches!(e, DomainEvent::OrderStatusChanged(_))));

    // 終端状態からは遷移できない
    let error = ctx
        .order_service
        .cancel_order(user_id, order.id())
        .await
        .unwrap_err();
    assert_eq!(error.code(), codes::INVALID_ORDER_TRANSITION);
}

#[tokio::test]
async fn test_other_users_order_is_hidden() {
    let ctx = TestContext::new(10).await;
    let owner = UserId::new();
    ctx.cart_service.add_item(owner, ctx.book_id, 1).await.unwrap();
    let order = ctx.checkout(owner).await.unwrap();

    let error = ctx
        .order_service
        .get_order_for_user(UserId::new(), order.id())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.code(), codes::ORDER_NOT_FOUND);
}

#[tokio::test]
async fn test_inventory_check_reports_every_short_line() {
    let ctx = TestContext::new(1).await;
    let other = BookId::new();
    ctx.stock_ledger.create_stock(other, 0).await.unwrap();

    let error = ctx
        .stock_ledger
        .check_stock(&[
            StockLine::new(ctx.book_id, 2),
            StockLine::new(other, 1),
        ])
        .await
        .unwrap_err();

    assert_eq!(error.errors().len(), 2);
    assert!(error.has_code(codes::INSUFFICIENT_STOCK));
}
