use crate::application::contract::{DiscountApi, InventoryApi, StockLine, ValidateCouponRequest};
use crate::application::ApplicationError;
use crate::domain::error::{codes, DomainError, ErrorKind};
use crate::domain::model::{ensure_positive, BookId, Cart, UserId};
use crate::domain::port::{CartStore, CatalogGateway, Logger};
use crate::domain::service::PricingPolicy;
use std::collections::HashMap;
use std::sync::Arc;

const COMPONENT: &str = "CartService";

/// カートサービス
/// ユーザーごとのカートを読み書きし、変更のたびに送料・税額を再計算する
///
/// 同じユーザーのカートへの同時更新は後勝ち（楽観ロックなし）
pub struct CartService {
    cart_store: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogGateway>,
    discount_api: Arc<dyn DiscountApi>,
    inventory_api: Arc<dyn InventoryApi>,
    pricing: PricingPolicy,
    logger: Arc<dyn Logger>,
}

impl CartService {
    pub fn new(
        cart_store: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogGateway>,
        discount_api: Arc<dyn DiscountApi>,
        inventory_api: Arc<dyn InventoryApi>,
        pricing: PricingPolicy,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            cart_store,
            catalog,
            discount_api,
            inventory_api,
            pricing,
            logger,
        }
    }

    /// カートを取得する。存在しなければ空のカートを返す
    pub async fn get(&self, user_id: UserId) -> Result<Cart, ApplicationError> {
        Ok(self
            .cart_store
            .load(user_id)
            .await?
            .unwrap_or_else(|| Cart::new(user_id)))
    }

    /// 書籍をカートに追加する
    /// 同じ書籍が既にあれば数量を合算し、合算後の数量で在庫を確認する
    pub async fn add_item(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<Cart, ApplicationError> {
        ensure_positive(quantity)?;

        let book = self.catalog.find_book(book_id).await?.ok_or_else(|| {
            DomainError::not_found(
                codes::BOOK_NOT_FOUND,
                format!("書籍が見つかりません: {}", book_id),
            )
        })?;

        let mut cart = self.get(user_id).await?;
        let requested = cart.quantity_of(book_id).saturating_add(quantity);
        self.inventory_api
            .check_stock(&[StockLine::new(book_id, requested)])
            .await?;

        cart.add_item(book.book_id, book.title, book.price, quantity)?;
        self.store(cart).await
    }

    /// 明細の数量を変更する
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<Cart, ApplicationError> {
        ensure_positive(quantity)?;

        let mut cart = self.get(user_id).await?;
        cart.update_quantity(book_id, quantity)?;
        self.inventory_api
            .check_stock(&[StockLine::new(book_id, quantity)])
            .await?;

        self.store(cart).await
    }

    /// 明細を削除する
    pub async fn remove_item(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Cart, ApplicationError> {
        let mut cart = self.get(user_id).await?;
        cart.remove_item(book_id)?;
        self.store(cart).await
    }

    /// カートを削除する
    pub async fn clear(&self, user_id: UserId) -> Result<(), ApplicationError> {
        self.cart_store.delete(user_id).await?;
        Ok(())
    }

    /// クーポンを適用する
    /// 失敗した場合、カートのクーポン欄は変更しない
    pub async fn apply_coupon(
        &self,
        user_id: UserId,
        code: &str,
    ) -> Result<Cart, ApplicationError> {
        let mut cart = self.get(user_id).await?;
        let quote = self
            .discount_api
            .validate_coupon(ValidateCouponRequest {
                code: code.to_string(),
                subtotal: cart.subtotal(),
            })
            .await?;

        cart.apply_coupon(code.to_string(), quote.discount);
        self.pricing.reprice(&mut cart);
        self.cart_store.save(&cart).await?;

        self.logger.info(
            COMPONENT,
            "クーポンを適用しました",
            None,
            Some(HashMap::from([
                ("user_id".to_string(), user_id.to_string()),
                ("code".to_string(), code.to_string()),
                ("discount".to_string(), quote.discount.to_string()),
            ])),
        );
        Ok(cart)
    }

    /// クーポンを取り外す
    pub async fn remove_coupon(&self, user_id: UserId) -> Result<Cart, ApplicationError> {
        let mut cart = self.get(user_id).await?;
        cart.remove_coupon();
        self.pricing.reprice(&mut cart);
        self.cart_store.save(&cart).await?;
        Ok(cart)
    }

    /// 明細変更後の割引を再計算して保存する
    /// クーポンが使えなくなった場合はコードを残し、割引額は小計で頭打ちにしたままにする
    async fn store(&self, mut cart: Cart) -> Result<Cart, ApplicationError> {
        if let Some(code) = cart.coupon_code().map(str::to_string) {
            let request = ValidateCouponRequest {
                code: code.clone(),
                subtotal: cart.subtotal(),
            };
            match self.discount_api.validate_coupon(request).await {
                Ok(quote) => cart.update_discount(quote.discount),
                Err(e) if e.kind() == ErrorKind::Unexpected => return Err(e),
                Err(e) => self.logger.debug(
                    COMPONENT,
                    &format!("適用中のクーポンが使えなくなりました: {}", e),
                    None,
                    Some(HashMap::from([("code".to_string(), code)])),
                ),
            }
        }

        self.pricing.reprice(&mut cart);
        self.cart_store.save(&cart).await?;
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{
        InMemoryCartStore, InMemoryCatalogGateway, InMemoryCouponRepository,
        InMemoryStockRepository, SystemClock, TracingLogger,
    };
    use crate::application::service::{CouponService, StockLedger};
    use crate::domain::model::{DiscountType, Money, NewCoupon, StockRecord};
    use crate::domain::port::{BookSnapshot, StockRepository};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Fixture {
        service: CartService,
        coupons: Arc<CouponService>,
        store: Arc<InMemoryCartStore>,
        book_id: BookId,
    }

    async fn fixture(stock: u32) -> Fixture {
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
        let book_id = BookId::new();

        let catalog = Arc::new(InMemoryCatalogGateway::new());
        catalog
            .add_book(BookSnapshot {
                book_id,
                title: "Rust入門".to_string(),
                price: Money::new(dec!(20.00)).unwrap(),
            })
            .await;

        let stocks = Arc::new(InMemoryStockRepository::new());
        stocks
            .insert(&StockRecord::new(book_id, stock))
            .await
            .unwrap();

        let coupons = Arc::new(CouponService::new(
            Arc::new(InMemoryCouponRepository::new()),
            Arc::new(SystemClock),
            logger.clone(),
        ));
        let store = Arc::new(InMemoryCartStore::new());
        let pricing = PricingPolicy::new(
            Money::new(dec!(5.00)).unwrap(),
            Some(Money::new(dec!(100.00)).unwrap()),
            Decimal::ZERO,
        )
        .unwrap();

        let service = CartService::new(
            store.clone(),
            catalog,
            coupons.clone(),
            Arc::new(StockLedger::new(stocks, logger.clone())),
            pricing,
            logger,
        );

        Fixture {
            service,
            coupons,
            store,
            book_id,
        }
    }

    async fn add_save10(coupons: &CouponService) {
        coupons
            .create_coupon(NewCoupon {
                code: "SAVE10".to_string(),
                discount_type: DiscountType::Percentage,
                value: dec!(10),
                expiry_date: None,
                usage_limit: 0,
                minimum_cart_amount: Money::new(dec!(50.00)).unwrap(),
                is_active: true,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_returns_empty_cart_when_missing() {
        let f = fixture(10).await;
        let user = UserId::new();

        let cart = f.service.get(user).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.user_id(), user);
    }

    #[tokio::test]
    async fn test_add_item_snapshots_catalog_and_prices_cart() {
        let f = fixture(10).await;
        let user = UserId::new();

        let cart = f.service.add_item(user, f.book_id, 3).await.unwrap();

        assert_eq!(cart.items()[0].title(), "Rust入門");
        assert_eq!(cart.subtotal().amount(), dec!(60.00));
        assert_eq!(cart.shipping_cost().amount(), dec!(5.00));
        assert_eq!(cart.total().amount(), dec!(65.00));
        assert!(f.store.load(user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_item_merges_and_checks_merged_quantity() {
        let f = fixture(4).await;
        let user = UserId::new();

        f.service.add_item(user, f.book_id, 3).await.unwrap();
        let err = f.service.add_item(user, f.book_id, 2).await.unwrap_err();

        assert_eq!(err.code(), codes::INSUFFICIENT_STOCK);
        assert_eq!(f.service.get(user).await.unwrap().quantity_of(f.book_id), 3);
    }

    #[tokio::test]
    async fn test_add_item_beyond_quantity_range_is_validation() {
        let f = fixture(u32::MAX).await;
        let user = UserId::new();

        f.service.add_item(user, f.book_id, u32::MAX).await.unwrap();
        let err = f.service.add_item(user, f.book_id, 1).await.unwrap_err();

        assert_eq!(err.code(), codes::INVALID_QUANTITY);
        assert_eq!(
            f.service.get(user).await.unwrap().quantity_of(f.book_id),
            u32::MAX
        );
    }

    #[tokio::test]
    async fn test_add_unknown_book_is_not_found() {
        let f = fixture(4).await;
        let err = f
            .service
            .add_item(UserId::new(), BookId::new(), 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), codes::BOOK_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_validation() {
        let f = fixture(4).await;
        let err = f
            .service
            .add_item(UserId::new(), f.book_id, 0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_and_remove_missing_line_is_not_found() {
        let f = fixture(4).await;
        let user = UserId::new();

        let err = f
            .service
            .update_quantity(user, f.book_id, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::CART_ITEM_NOT_FOUND);

        let err = f.service.remove_item(user, f.book_id).await.unwrap_err();
        assert_eq!(err.code(), codes::CART_ITEM_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_apply_coupon() {
        let f = fixture(10).await;
        add_save10(&f.coupons).await;
        let user = UserId::new();
        f.service.add_item(user, f.book_id, 3).await.unwrap();

        let cart = f.service.apply_coupon(user, "SAVE10").await.unwrap();

        assert_eq!(cart.coupon_code(), Some("SAVE10"));
        assert_eq!(cart.discount().amount(), dec!(6.00));
        assert_eq!(cart.total().amount(), dec!(59.00));
    }

    #[tokio::test]
    async fn test_apply_coupon_below_minimum_leaves_cart_unchanged() {
        let f = fixture(10).await;
        add_save10(&f.coupons).await;
        let user = UserId::new();
        f.service.add_item(user, f.book_id, 1).await.unwrap();

        let err = f.service.apply_coupon(user, "SAVE10").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        let cart = f.service.get(user).await.unwrap();
        assert_eq!(cart.coupon_code(), None);
        assert!(cart.discount().is_zero());
    }

    #[tokio::test]
    async fn test_discount_follows_item_changes() {
        let f = fixture(10).await;
        add_save10(&f.coupons).await;
        let user = UserId::new();
        f.service.add_item(user, f.book_id, 3).await.unwrap();
        f.service.apply_coupon(user, "SAVE10").await.unwrap();

        let cart = f.service.update_quantity(user, f.book_id, 4).await.unwrap();
        assert_eq!(cart.discount().amount(), dec!(8.00));

        // 最低金額を下回るとクーポンは残るが割引は再計算されない
        let cart = f.service.update_quantity(user, f.book_id, 1).await.unwrap();
        assert_eq!(cart.coupon_code(), Some("SAVE10"));
        assert!(cart.discount() <= cart.subtotal());
    }

    #[tokio::test]
    async fn test_remove_coupon_and_clear() {
        let f = fixture(10).await;
        add_save10(&f.coupons).await;
        let user = UserId::new();
        f.service.add_item(user, f.book_id, 3).await.unwrap();
        f.service.apply_coupon(user, "SAVE10").await.unwrap();

        let cart = f.service.remove_coupon(user).await.unwrap();
        assert_eq!(cart.coupon_code(), None);
        assert!(cart.discount().is_zero());

        f.service.clear(user).await.unwrap();
        assert!(f.store.load(user).await.unwrap().is_none());
        f.service.clear(user).await.unwrap();
    }
}
