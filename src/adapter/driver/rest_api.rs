use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapter::driver::request_dto::{
    AddItemRequest, AdjustStockRequest, ApplyCouponRequest, CheckoutRequest, CreateCouponRequest,
    CreateStockRequest, OrdersQueryParams, StockQueryParams, UpdateQuantityRequest,
};
use crate::adapter::driver::response_dto::{
    CartResponse, CheckoutResponse, CouponResponse, OrderDetailResponse, OrderSummaryResponse,
    StockResponse,
};
use crate::application::cancellation::{CancelOnDrop, CancellationSignal};
use crate::application::service::{
    CartService, CheckoutService, CouponService, OrderService, StockLedger,
};
use crate::application::ApplicationError;
use crate::domain::error::{codes, DomainError, ErrorKind};
use crate::domain::model::{
    BookId, DiscountType, Money, NewCoupon, Order, OrderId, OrderStatus, ShippingAddress, UserId,
};

/// ユーザーIDを渡すヘッダー
pub const USER_ID_HEADER: &str = "x-user-id";

/// エラー詳細
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    pub details: Vec<ErrorDetail>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub cart_service: Arc<CartService>,
    pub checkout_service: Arc<CheckoutService>,
    pub order_service: Arc<OrderService>,
    pub coupon_service: Arc<CouponService>,
    pub stock_ledger: Arc<StockLedger>,
}

/// X-User-Idヘッダーから取り出した認証済みユーザー
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| {
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "X-User-IdヘッダーにユーザーIDを指定してください",
                    "Auth.Unauthorized",
                    Vec::new(),
                )
            })?;
        Ok(AuthenticatedUser(UserId::from_uuid(user_id)))
    }
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route(
            "/cart/items/:book_id",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/cart/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/checkout", post(checkout))
        .route("/orders", get(get_my_orders))
        .route("/orders/:order_id", get(get_my_order))
        .route("/orders/:order_id/cancel", post(cancel_order))
        .route("/admin/orders", get(get_orders_by_status))
        .route("/admin/orders/:order_id/process", post(start_processing))
        .route("/admin/orders/:order_id/ship", post(mark_order_as_shipped))
        .route("/admin/orders/:order_id/deliver", post(mark_order_as_delivered))
        .route("/admin/orders/:order_id/fail", post(mark_order_as_failed))
        .route("/admin/coupons", post(create_coupon))
        .route("/admin/coupons/:code", get(get_coupon))
        .route("/admin/inventory", post(create_stock).get(get_stocks))
        .route("/admin/inventory/:book_id/increase", post(increase_stock))
        .route("/admin/inventory/:book_id/decrease", post(decrease_stock))
        .route("/inventory/:book_id", get(get_stock))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "bookstore-checkout",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// カート取得エンドポイント
async fn get_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .get(user_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

// カート削除エンドポイント
async fn clear_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<StatusCode> {
    state
        .cart_service
        .clear(user_id)
        .await
        .map_err(map_application_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// カートに書籍を追加するエンドポイント
async fn add_cart_item(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .add_item(user_id, BookId::from_uuid(request.book_id), request.quantity)
        .await
        .map_err(map_application_error)?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

// 数量変更エンドポイント
async fn update_cart_item(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(book_id): Path<Uuid>,
    Json(request): Json<UpdateQuantityRequest>,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .update_quantity(user_id, BookId::from_uuid(book_id), request.quantity)
        .await
        .map_err(map_application_error)?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

// 明細削除エンドポイント
async fn remove_cart_item(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(book_id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .remove_item(user_id, BookId::from_uuid(book_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

// クーポン適用エンドポイント
async fn apply_coupon(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<ApplyCouponRequest>,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .apply_coupon(user_id, &request.code)
        .await
        .map_err(map_application_error)?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

// クーポン取り外しエンドポイント
async fn remove_coupon(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .remove_coupon(user_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

// チェックアウトエンドポイント
// 別タスクで実行し、クライアントが切断したらキャンセル信号を送る。
// 実行中のストレージ操作は最後まで完了する
async fn checkout(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let address = request.shipping_address;
    let shipping_address = ShippingAddress::new(
        address.postal_code,
        address.prefecture,
        address.city,
        address.address_line1,
        address.address_line2,
    )
    .map_err(|errors| map_application_error(ApplicationError::from_errors(errors)))?;

    let (handle, signal) = CancellationSignal::new();
    let guard = CancelOnDrop::new(handle);
    let service = state.checkout_service.clone();
    let task =
        tokio::spawn(async move { service.checkout(user_id, shipping_address, &signal).await });

    let result = task.await;
    guard.disarm();

    let receipt = result
        .map_err(|e| {
            map_application_error(
                DomainError::unexpected(codes::STORAGE_FAILURE, e.to_string()).into(),
            )
        })?
        .map_err(map_application_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse::from_receipt(&receipt)),
    ))
}

// 自分の注文一覧取得エンドポイント
async fn get_my_orders(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Json<Vec<OrderSummaryResponse>>> {
    let orders = state
        .order_service
        .list_orders_for_user(user_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(
        orders.iter().map(OrderSummaryResponse::from_order).collect(),
    ))
}

// 自分の注文詳細取得エンドポイント
async fn get_my_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderDetailResponse>> {
    let order = state
        .order_service
        .get_order_for_user(user_id, OrderId::from_uuid(order_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(OrderDetailResponse::from_order(&order)))
}

// 注文キャンセルエンドポイント
async fn cancel_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderDetailResponse>> {
    let order = state
        .order_service
        .cancel_order(user_id, OrderId::from_uuid(order_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(OrderDetailResponse::from_order(&order)))
}

// ステータス別注文一覧取得エンドポイント
async fn get_orders_by_status(
    State(state): State<AppState>,
    query: Result<Query<OrdersQueryParams>, axum::extract::rejection::QueryRejection>,
) -> ApiResult<Json<Vec<OrderSummaryResponse>>> {
    let Query(params) = query.map_err(|_| invalid_parameter())?;
    let status = OrderStatus::from_string(&params.status)
        .map_err(|e| map_application_error(e.into()))?;

    let orders = state
        .order_service
        .list_orders_by_status(status)
        .await
        .map_err(map_application_error)?;
    Ok(Json(
        orders.iter().map(OrderSummaryResponse::from_order).collect(),
    ))
}

fn order_detail(result: Result<Order, ApplicationError>) -> ApiResult<Json<OrderDetailResponse>> {
    let order = result.map_err(map_application_error)?;
    Ok(Json(OrderDetailResponse::from_order(&order)))
}

// 注文処理開始エンドポイント
async fn start_processing(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderDetailResponse>> {
    order_detail(
        state
            .order_service
            .start_processing(OrderId::from_uuid(order_id))
            .await,
    )
}

// 注文発送エンドポイント
async fn mark_order_as_shipped(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderDetailResponse>> {
    order_detail(
        state
            .order_service
            .mark_as_shipped(OrderId::from_uuid(order_id))
            .await,
    )
}

// 注文配達完了エンドポイント
async fn mark_order_as_delivered(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderDetailResponse>> {
    order_detail(
        state
            .order_service
            .mark_as_delivered(OrderId::from_uuid(order_id))
            .await,
    )
}

// 注文失敗エンドポイント
async fn mark_order_as_failed(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderDetailResponse>> {
    order_detail(
        state
            .order_service
            .mark_as_failed(OrderId::from_uuid(order_id))
            .await,
    )
}

// クーポン作成エンドポイント
async fn create_coupon(
    State(state): State<AppState>,
    Json(request): Json<CreateCouponRequest>,
) -> ApiResult<(StatusCode, Json<CouponResponse>)> {
    let discount_type = DiscountType::from_string(&request.discount_type)
        .map_err(|e| map_application_error(e.into()))?;
    let minimum_cart_amount = match request.minimum_cart_amount {
        Some(amount) => Money::new(amount).map_err(|e| map_application_error(e.into()))?,
        None => Money::zero(),
    };

    let coupon = state
        .coupon_service
        .create_coupon(NewCoupon {
            code: request.code,
            discount_type,
            value: request.value,
            expiry_date: request.expiry_date,
            usage_limit: request.usage_limit,
            minimum_cart_amount,
            is_active: request.is_active,
        })
        .await
        .map_err(map_application_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CouponResponse::from_coupon(&coupon)),
    ))
}

// クーポン詳細取得エンドポイント
async fn get_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<CouponResponse>> {
    let coupon = state
        .coupon_service
        .get_coupon(&code)
        .await
        .map_err(map_application_error)?;
    Ok(Json(CouponResponse::from_coupon(&coupon)))
}

// 在庫作成エンドポイント
async fn create_stock(
    State(state): State<AppState>,
    Json(request): Json<CreateStockRequest>,
) -> ApiResult<(StatusCode, Json<StockResponse>)> {
    let stock = state
        .stock_ledger
        .create_stock(BookId::from_uuid(request.book_id), request.quantity)
        .await
        .map_err(map_application_error)?;
    Ok((StatusCode::CREATED, Json(StockResponse::from_stock(&stock))))
}

// 在庫一覧取得エンドポイント
async fn get_stocks(
    State(state): State<AppState>,
    query: Result<Query<StockQueryParams>, axum::extract::rejection::QueryRejection>,
) -> ApiResult<Json<Vec<StockResponse>>> {
    let Query(params) = query.map_err(|_| invalid_parameter())?;
    let stocks = state
        .stock_ledger
        .list_stock(params.max_quantity)
        .await
        .map_err(map_application_error)?;
    Ok(Json(stocks.iter().map(StockResponse::from_stock).collect()))
}

// 在庫詳細取得エンドポイント
async fn get_stock(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> ApiResult<Json<StockResponse>> {
    let stock = state
        .stock_ledger
        .get_stock(BookId::from_uuid(book_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(StockResponse::from_stock(&stock)))
}

// 在庫加算エンドポイント
async fn increase_stock(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> ApiResult<Json<StockResponse>> {
    let book_id = BookId::from_uuid(book_id);
    state
        .stock_ledger
        .increase_stock(book_id, request.quantity)
        .await
        .map_err(map_application_error)?;
    get_stock(State(state), Path(book_id.as_uuid())).await
}

// 在庫減算エンドポイント
async fn decrease_stock(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> ApiResult<Json<StockResponse>> {
    let book_id = BookId::from_uuid(book_id);
    state
        .stock_ledger
        .decrease_stock(book_id, request.quantity)
        .await
        .map_err(map_application_error)?;
    get_stock(State(state), Path(book_id.as_uuid())).await
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    code: impl Into<String>,
    details: Vec<ErrorDetail>,
) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.into(),
            code: code.into(),
            details,
        }),
    )
}

fn invalid_parameter() -> (StatusCode, Json<ApiError>) {
    error_response(
        StatusCode::BAD_REQUEST,
        "無効なクエリパラメータです",
        codes::INVALID_VALUE,
        Vec::new(),
    )
}

// エラー種別をHTTPステータスコードにマッピング
fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Failure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// アプリケーションエラーをHTTPエラーにマッピング
// Unexpectedは詳細をログに残し、利用者には汎用メッセージだけを返す
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let kind = err.kind();
    let status = status_for(kind);

    if kind == ErrorKind::Unexpected {
        tracing::error!(code = err.code(), error = %err, "想定外のエラーが発生しました");
        return error_response(
            status,
            "内部エラーが発生しました",
            err.code(),
            Vec::new(),
        );
    }

    let errors = err.errors();
    let message = errors
        .first()
        .map(|e| e.message().to_string())
        .unwrap_or_else(|| err.to_string());
    let details = errors
        .iter()
        .map(|e| ErrorDetail {
            code: e.code().to_string(),
            message: e.message().to_string(),
        })
        .collect();

    error_response(status, message, err.code(), details)
}
