//! Integration tests for the REST stock client.
//!
//! Spins up a local stock API with `axum` on an ephemeral port and points
//! `HttpStockService` (and a `CartStore` on top of it) at it.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::SecretString;
use storecart_client::{
    CartError, HttpStockService, MemoryStore, Notification, StockApiConfig, StockError,
    StockService, TransientError,
};
use storecart_core::ProductId;
use storecart_integration_tests::{amounts, cart_store};
use url::Url;

const TOKEN: &str = "k8Jd02Lq9zXv";

/// Stock requests for this product never answer within the client timeout.
const SLOW_PRODUCT: i32 = 999;

#[derive(Clone)]
struct ApiState {
    stock: Arc<HashMap<i32, u32>>,
    product_hits: Arc<AtomicUsize>,
    require_token: bool,
}

fn authorized(state: &ApiState, headers: &HeaderMap) -> bool {
    !state.require_token
        || headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn stock_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id == SLOW_PRODUCT {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    match state.stock.get(&id) {
        Some(amount) => Json(serde_json::json!({ "id": id, "amount": amount })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn product_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id == 500 {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if id == 501 {
        return "not json".into_response();
    }
    if !state.stock.contains_key(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    state.product_hits.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({
        "id": id,
        "title": format!("Tênis {id}"),
        "price": 179.9,
        "image": format!("https://example.com/{id}.jpg"),
    }))
    .into_response()
}

/// Start the API under `/api` and return its base URL.
async fn spawn_api(state: ApiState) -> Url {
    let app = Router::new()
        .route("/api/stock/{id}", get(stock_handler))
        .route("/api/products/{id}", get(product_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Url::parse(&format!("http://{addr}/api")).unwrap()
}

fn api_state(stock: &[(i32, u32)], require_token: bool) -> ApiState {
    ApiState {
        stock: Arc::new(stock.iter().copied().collect()),
        product_hits: Arc::new(AtomicUsize::new(0)),
        require_token,
    }
}

fn config(base_url: Url) -> StockApiConfig {
    let mut config = StockApiConfig::new(base_url);
    config.timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn test_fetches_stock_and_product() {
    let base_url = spawn_api(api_state(&[(1, 3)], false)).await;
    let service = HttpStockService::new(&config(base_url)).unwrap();

    let stock = service.stock(ProductId::new(1)).await.unwrap();
    assert_eq!(stock.amount, 3);
    assert_eq!(stock.product_id, Some(ProductId::new(1)));

    let product = service.product(ProductId::new(1)).await.unwrap();
    assert_eq!(product.title, "Tênis 1");
    assert_eq!(product.price.to_string(), "179.9");
    assert_eq!(product.image_url, "https://example.com/1.jpg");
}

#[tokio::test]
async fn test_product_metadata_is_cached() {
    let state = api_state(&[(1, 3)], false);
    let hits = state.product_hits.clone();
    let base_url = spawn_api(state).await;
    let service = HttpStockService::new(&config(base_url)).unwrap();

    for _ in 0..3 {
        service.product(ProductId::new(1)).await.unwrap();
    }

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_error_statuses_map_to_stock_errors() {
    let base_url = spawn_api(api_state(&[(1, 3)], false)).await;
    let service = HttpStockService::new(&config(base_url)).unwrap();

    assert!(matches!(
        service.stock(ProductId::new(2)).await,
        Err(StockError::NotFound(path)) if path == "/api/stock/2"
    ));
    assert!(matches!(
        service.product(ProductId::new(500)).await,
        Err(StockError::Api { status: 500, .. })
    ));
    assert!(matches!(
        service.product(ProductId::new(501)).await,
        Err(StockError::Parse(_))
    ));
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let base_url = spawn_api(api_state(&[(1, 3)], true)).await;

    let anonymous = HttpStockService::new(&config(base_url.clone())).unwrap();
    assert!(matches!(
        anonymous.stock(ProductId::new(1)).await,
        Err(StockError::Api { status: 401, .. })
    ));

    let mut authed = config(base_url);
    authed.api_token = Some(SecretString::from(TOKEN));
    let service = HttpStockService::new(&authed).unwrap();
    assert_eq!(service.stock(ProductId::new(1)).await.unwrap().amount, 3);
}

#[tokio::test]
async fn test_unreachable_api_is_an_http_error() {
    // Bind then drop a listener to get a port nobody is serving.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base_url = Url::parse(&format!("http://{addr}")).unwrap();
    let service = HttpStockService::new(&config(base_url)).unwrap();
    assert!(matches!(
        service.stock(ProductId::new(1)).await,
        Err(StockError::Http(_))
    ));
}

#[tokio::test]
async fn test_hung_stock_call_times_out() {
    let base_url = spawn_api(api_state(&[(SLOW_PRODUCT, 3)], false)).await;
    let mut short = config(base_url);
    short.timeout = Duration::from_secs(1);
    let service = Arc::new(HttpStockService::new(&short).unwrap());

    let err = service.stock(ProductId::new(SLOW_PRODUCT)).await.unwrap_err();
    assert!(matches!(err, StockError::Http(ref e) if e.is_timeout()), "{err:?}");

    let (store, notifier) = cart_store(service, Arc::new(MemoryStore::new())).await;
    let err = store
        .add_product(ProductId::new(SLOW_PRODUCT))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CartError::Transient(TransientError::Stock(StockError::Http(_)))
    ));
    assert!(store.is_empty());
    assert_eq!(notifier.notifications(), vec![Notification::AddFailed]);
}

#[tokio::test]
async fn test_cart_store_over_http() {
    let base_url = spawn_api(api_state(&[(7, 3)], false)).await;
    let service = Arc::new(HttpStockService::new(&config(base_url)).unwrap());
    let (store, notifier) = cart_store(service, Arc::new(MemoryStore::new())).await;

    for _ in 0..4 {
        let _ = store.add_product(ProductId::new(7)).await;
    }
    store
        .update_product_amount(ProductId::new(7), 2)
        .await
        .unwrap();

    assert_eq!(amounts(&store), vec![(7, 2)]);
    assert_eq!(store.cart()[0].title, "Tênis 7");
    assert_eq!(notifier.notifications().len(), 1);
}
