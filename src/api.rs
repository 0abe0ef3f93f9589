//! HTTP surface over a single shared [`StoreSession`](crate::session::StoreSession).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::aggregates::{Address, CartLine, Order, OrderError, PaymentMethod, Product, ResolvedPrice};
use crate::domain::timeline::{TimelineEntry, TimelineError};
use crate::domain::value_objects::Money;
use crate::services::postal::PostalError;
use crate::services::{EventPublisher, PostalAddress, PostalLookup, ProductAdvisor};
use crate::session::SharedSession;
use crate::StoreError;

#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    pub advisor: Arc<dyn ProductAdvisor>,
    pub postal: PostalLookup,
    pub events: EventPublisher,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "programada-store"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/cart", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/items", post(add_item).put(update_item).delete(remove_item))
        .route("/api/v1/checkout", post(checkout))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/stage", post(advance_order))
        .route("/api/v1/session", get(get_session).post(login).delete(logout))
        .route("/api/v1/postal/:cep", get(postal_lookup))
        .route("/api/v1/advisor", post(ask_advisor))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

fn reject(e: StoreError) -> (StatusCode, String) {
    let status = match &e {
        StoreError::ProductNotFound(_) | StoreError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::NotLoggedIn => StatusCode::UNAUTHORIZED,
        StoreError::Order(OrderError::EmptyCart) | StoreError::Timeline(TimelineError::Regression { .. }) => StatusCode::CONFLICT,
        StoreError::EmptyName | StoreError::Product(_) | StoreError::Cart(_) | StoreError::Order(_) | StoreError::Timeline(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        StoreError::Postal(PostalError::InvalidCep(_)) => StatusCode::BAD_REQUEST,
        StoreError::Postal(PostalError::NotFound(_)) => StatusCode::NOT_FOUND,
        StoreError::Postal(_) => StatusCode::BAD_GATEWAY,
        StoreError::Session(_) | StoreError::Catalog(_) | StoreError::Advisor(_) | StoreError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

// ---- views ----

#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub price: ResolvedPrice,
    pub discount_percent: Option<u32>,
}

impl ProductView {
    fn new(product: &Product, storage: Option<&str>) -> Result<Self, StoreError> {
        let price = product.resolve_price(storage)?;
        Ok(Self { discount_percent: price.discount_percent(), product: product.clone(), price })
    }
}

#[derive(Debug, Serialize)]
pub struct CartView { pub lines: Vec<CartLine>, pub subtotal: Money, pub item_count: u32 }

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status: &'static str,
    pub timeline: Vec<TimelineEntry>,
    pub progress: f64,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            status: order.stage().label(),
            timeline: order.timeline().entries(),
            progress: order.timeline().progress(),
            order: order.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView { pub user: Option<String> }

// ---- catalog ----

#[derive(Debug, Deserialize)] pub struct StorageParams { pub storage: Option<String> }

async fn list_products(State(s): State<AppState>) -> ApiResult<Json<Vec<ProductView>>> {
    let session = s.session.lock().await;
    let views = session.catalog().iter().map(|p| ProductView::new(p, None)).collect::<Result<Vec<_>, _>>().map_err(reject)?;
    Ok(Json(views))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<String>, Query(q): Query<StorageParams>) -> ApiResult<Json<ProductView>> {
    let session = s.session.lock().await;
    let product = session.product(&id).map_err(reject)?;
    ProductView::new(product, q.storage.as_deref()).map(Json).map_err(reject)
}

// ---- cart ----

#[derive(Debug, Deserialize)] pub struct CartItemRequest { pub product_id: String, pub storage: Option<String> }
#[derive(Debug, Deserialize)] pub struct QuantityRequest { pub product_id: String, pub storage: Option<String>, pub quantity: i64 }

fn cart_view(session: &crate::session::StoreSession) -> CartView {
    let cart = session.cart();
    CartView { lines: cart.snapshot(), subtotal: cart.subtotal(), item_count: cart.item_count() }
}

async fn get_cart(State(s): State<AppState>) -> Json<CartView> {
    Json(cart_view(&*s.session.lock().await))
}

async fn add_item(State(s): State<AppState>, Json(r): Json<CartItemRequest>) -> ApiResult<(StatusCode, Json<CartView>)> {
    let mut session = s.session.lock().await;
    session.add_to_cart(&r.product_id, r.storage.as_deref()).map_err(reject)?;
    Ok((StatusCode::CREATED, Json(cart_view(&session))))
}

async fn update_item(State(s): State<AppState>, Json(r): Json<QuantityRequest>) -> Json<CartView> {
    let mut session = s.session.lock().await;
    session.set_quantity(&r.product_id, r.storage.as_deref(), r.quantity);
    Json(cart_view(&session))
}

async fn remove_item(State(s): State<AppState>, Query(r): Query<CartItemRequest>) -> Json<CartView> {
    let mut session = s.session.lock().await;
    session.remove_from_cart(&r.product_id, r.storage.as_deref());
    Json(cart_view(&session))
}

async fn clear_cart(State(s): State<AppState>) -> StatusCode {
    s.session.lock().await.clear_cart();
    StatusCode::NO_CONTENT
}

// ---- checkout & orders ----

#[derive(Debug, Deserialize)] pub struct CheckoutRequest { pub address: Address, pub payment_method: PaymentMethod }
#[derive(Debug, Deserialize)] pub struct StageRequest { pub step: u8 }

async fn checkout(State(s): State<AppState>, Json(r): Json<CheckoutRequest>) -> ApiResult<(StatusCode, Json<OrderView>)> {
    let (view, events) = {
        let mut session = s.session.lock().await;
        let view = OrderView::from(session.checkout(r.address, r.payment_method).map_err(reject)?);
        (view, session.take_events())
    };
    s.events.publish(events).await;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_orders(State(s): State<AppState>) -> Json<Vec<OrderView>> {
    Json(s.session.lock().await.orders().iter().map(OrderView::from).collect())
}

async fn get_order(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<OrderView>> {
    let session = s.session.lock().await;
    session.order(&id).map(|o| Json(OrderView::from(o))).map_err(reject)
}

async fn advance_order(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<StageRequest>) -> ApiResult<Json<OrderView>> {
    let (view, events) = {
        let mut session = s.session.lock().await;
        session.apply_fulfillment(&id, r.step).map_err(reject)?;
        let view = OrderView::from(session.order(&id).map_err(reject)?);
        (view, session.take_events())
    };
    s.events.publish(events).await;
    Ok(Json(view))
}

// ---- customer ----

#[derive(Debug, Deserialize)] pub struct LoginRequest { pub name: String }

async fn get_session(State(s): State<AppState>) -> Json<SessionView> {
    Json(SessionView { user: s.session.lock().await.current_user() })
}

async fn login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> ApiResult<Json<SessionView>> {
    let user = s.session.lock().await.login(&r.name).map_err(reject)?;
    Ok(Json(SessionView { user: Some(user) }))
}

async fn logout(State(s): State<AppState>) -> ApiResult<StatusCode> {
    s.session.lock().await.logout().map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- collaborators ----

#[derive(Debug, Deserialize)] pub struct AdvisorRequest { pub query: String }
#[derive(Debug, Serialize)] pub struct AdvisorResponse { pub answer: String }

async fn postal_lookup(State(s): State<AppState>, Path(cep): Path<String>) -> ApiResult<Json<PostalAddress>> {
    s.postal.lookup(&cep).await.map(Json).map_err(|e| reject(e.into()))
}

async fn ask_advisor(State(s): State<AppState>, Json(r): Json<AdvisorRequest>) -> Json<AdvisorResponse> {
    let inventory = s.session.lock().await.catalog().to_vec();
    Json(AdvisorResponse { answer: s.advisor.ask(&r.query, &inventory).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fallback_products;
    use crate::domain::aggregates::OrderFactory;
    use crate::services::advisor::{GeminiAdvisor, DEMO_REPLY};
    use crate::session::{demo_orders, MemorySessionStore, StoreSession};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        let session = StoreSession::new(fallback_products(), OrderFactory::new(10235), Box::new(MemorySessionStore::default()))
            .with_orders(demo_orders())
            .into_shared();
        router(AppState {
            session,
            advisor: Arc::new(GeminiAdvisor::new(None, "gemini-2.5-flash", Duration::from_secs(1)).unwrap()),
            postal: PostalLookup::new("http://127.0.0.1:1", Duration::from_millis(200)).unwrap(),
            events: EventPublisher::default(),
        })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => { req = req.header("content-type", "application/json"); Body::from(v.to_string()) }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_product_with_storage_selection() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/v1/products/iphone-13?storage=256GB", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"]["storage"], "256GB");
        assert_eq!(body["discount_percent"], 35);

        let (status, _) = call(&app, "GET", "/api/v1/products/iphone-13?storage=2TB", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = call(&app, "GET", "/api/v1/products/galaxy", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cart_to_order_flow() {
        let app = app();
        let (status, cart) = call(&app, "POST", "/api/v1/cart/items", Some(json!({"product_id": "iphone-13"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(cart["item_count"], 1);

        let (_, cart) = call(&app, "PUT", "/api/v1/cart/items", Some(json!({"product_id": "iphone-13", "storage": "128GB", "quantity": 0}))).await;
        assert_eq!(cart["lines"][0]["quantity"], 1);

        let checkout = json!({
            "address": {"street": "Rua 9", "city": "Goiânia", "state": "GO", "zip": "74110-100"},
            "payment_method": "instant-transfer"
        });
        let (status, _) = call(&app, "POST", "/api/v1/checkout", Some(checkout.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "POST", "/api/v1/session", Some(json!({"name": "Maria"}))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, order) = call(&app, "POST", "/api/v1/checkout", Some(checkout.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["id"], "10235");
        assert_eq!(order["current_step"], 1);
        assert_eq!(order["status"], "Confirmado");
        assert_eq!(order["progress"], 0.0);
        assert_eq!(order["timeline"][1]["state"], "pending");

        let (_, cart) = call(&app, "GET", "/api/v1/cart", None).await;
        assert_eq!(cart["item_count"], 0);
        let (status, _) = call(&app, "POST", "/api/v1/checkout", Some(checkout)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, orders) = call(&app, "GET", "/api/v1/orders", None).await;
        assert_eq!(orders.as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_huge_quantity_is_capped() {
        let app = app();
        call(&app, "POST", "/api/v1/cart/items", Some(json!({"product_id": "iphone-13"}))).await;
        let (status, cart) = call(&app, "PUT", "/api/v1/cart/items", Some(json!({"product_id": "iphone-13", "quantity": 99_999_999_999i64}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["lines"][0]["quantity"], 99);
        let (status, cart) = call(&app, "POST", "/api/v1/cart/items", Some(json!({"product_id": "iphone-14"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(cart["item_count"], 100);
    }

    #[tokio::test]
    async fn test_stage_updates() {
        let app = app();
        let (status, order) = call(&app, "POST", "/api/v1/orders/10234/stage", Some(json!({"step": 4}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "Entregue");
        assert_eq!(order["progress"], 1.0);

        let (status, _) = call(&app, "POST", "/api/v1/orders/10234/stage", Some(json!({"step": 2}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = call(&app, "POST", "/api/v1/orders/10234/stage", Some(json!({"step": 7}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_session_and_collaborators() {
        let app = app();
        let (_, session) = call(&app, "GET", "/api/v1/session", None).await;
        assert_eq!(session["user"], Value::Null);
        let (status, _) = call(&app, "POST", "/api/v1/session", Some(json!({"name": "  "}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, answer) = call(&app, "POST", "/api/v1/advisor", Some(json!({"query": "Qual iPhone comprar?"}))).await;
        assert_eq!(answer["answer"], DEMO_REPLY);

        let (status, _) = call(&app, "GET", "/api/v1/postal/12", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&app, "GET", "/api/v1/postal/74110100", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
