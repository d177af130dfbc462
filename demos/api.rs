//! HTTP surface shared by the demo binaries.
//!
//! Each binary names its concrete service as `crate::Catalog`.

use crate::Catalog;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use catalog_cache::observability::CountingMetrics;
use catalog_cache::{Error, ProductDraft, ProductQuery, QueryParameters, ReadConsistency};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub metrics: Arc<CountingMetrics>,
}

/// Maps library errors onto HTTP responses.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError(Error::ValidationError(e.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError(Error::ValidationError(e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let params = QueryParameters::from_query(query)?;
    let page = state.catalog.list_products(&params).await?;
    Ok(Json(page).into_response())
}

async fn list_all(State(state): State<AppState>) -> Result<Response, ApiError> {
    let products = state.catalog.list_all().await?;
    Ok(Json(products).into_response())
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let product = state
        .catalog
        .get_product(id, ReadConsistency::Eventual)
        .await?;
    Ok(Json(product).into_response())
}

async fn create_product(
    State(state): State<AppState>,
    draft: Result<Json<ProductDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = draft?;
    let product = state.catalog.create_product(draft).await?;
    let location = format!("/api/products/{}", product.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(product),
    )
        .into_response())
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    draft: Result<Json<ProductDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = draft?;
    let product = state.catalog.update_product(id, draft).await?;
    Ok(Json(product).into_response())
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let product = state.catalog.delete_product(id).await?;
    Ok(Json(product).into_response())
}

async fn health(State(state): State<AppState>) -> Response {
    if state.catalog.health_check().await {
        Json(json!({ "status": "healthy", "cache": "up" })).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "cache": "down" })),
        )
            .into_response()
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.metrics.snapshot();
    Json(json!({
        "hits": snapshot.hits,
        "misses": snapshot.misses,
        "sets": snapshot.sets,
        "deletes": snapshot.deletes,
        "errors": snapshot.errors,
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/all", get(list_all))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .with_state(state)
}

/// Bind `BIND_ADDR` (default `127.0.0.1:3000`) and serve until shutdown.
pub async fn serve(state: AppState) {
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");

    println!("Server running on http://{}", addr);
    println!("List endpoint: http://{}/api/products?pageNumber=1&pageSize=10", addr);
    println!("Metrics endpoint: http://{}/metrics", addr);
    println!("Health check: http://{}/health", addr);

    axum::serve(listener, router(state))
        .await
        .expect("Failed to start server");
}
