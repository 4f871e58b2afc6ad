use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::{Attributes, InventoryReport, ListQuery, NewProduct, Product, ProductPatch},
    AppState,
};

/// Request bodies must be JSON objects.
fn into_document(payload: Result<Json<Value>, JsonRejection>) -> AppResult<Attributes> {
    match payload? {
        Json(Value::Object(doc)) => Ok(doc),
        Json(_) => Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<(StatusCode, Json<Vec<Product>>)> {
    let query = ListQuery::from_params(params);

    let start = Instant::now();
    let products = state.store.find(&query).await.map_err(AppError::server)?;
    let elapsed = start.elapsed();

    info!(
        count = products.len(),
        filters = query.filters.len(),
        sort_keys = query.sort.len(),
        elapsed_ms = elapsed.as_millis(),
        "Listed products"
    );

    Ok((StatusCode::OK, Json(products)))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let doc = into_document(payload)?;
    let new_product = NewProduct::from_document(doc).map_err(|e| AppError::client(e.into()))?;

    let start = Instant::now();
    let product = state
        .store
        .insert(new_product)
        .await
        .map_err(AppError::client)?;
    let elapsed = start.elapsed();

    info!(
        id = %product.id,
        name = %product.name,
        elapsed_ms = elapsed.as_millis(),
        "Created product"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let doc = into_document(payload)?;
    let patch = ProductPatch::from_document(doc).map_err(|e| AppError::client(e.into()))?;

    let start = Instant::now();
    let product = state
        .store
        .find_by_id_and_update(&id, patch)
        .await
        .map_err(AppError::client)?;
    let elapsed = start.elapsed();

    info!(id = %product.id, elapsed_ms = elapsed.as_millis(), "Updated product");

    Ok((StatusCode::OK, Json(product)))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let start = Instant::now();
    let product = state
        .store
        .find_by_id_and_delete(&id)
        .await
        .map_err(AppError::server)?;
    let elapsed = start.elapsed();

    info!(id = %product.id, elapsed_ms = elapsed.as_millis(), "Deleted product");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Product deleted" })),
    ))
}

// ── Report ────────────────────────────────────────────────────────────────────

pub async fn inventory_report(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<InventoryReport>)> {
    let start = Instant::now();
    let report = state.store.report().await.map_err(AppError::server)?;
    let elapsed = start.elapsed();

    info!(
        total_quantity = report.total_quantity,
        total_value = report.total_value,
        elapsed_ms = elapsed.as_millis(),
        "Computed inventory report"
    );

    Ok((StatusCode::OK, Json(report)))
}
