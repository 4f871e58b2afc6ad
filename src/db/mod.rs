//! Product storage.
//!
//! Handlers talk to a [`ProductStore`]; each request maps to exactly one call.
//! [`postgres::PgProductStore`] is the production backend.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{InventoryReport, ListQuery, NewProduct, Product, ProductPatch, ValidationError};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgProductStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Product not found")]
    NotFound,
    /// Validation rejections, cast failures and database errors alike.
    #[error("{0}")]
    OperationFailed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let message = match err.as_database_error() {
            Some(db_err) => db_err.message().to_string(),
            None => err.to_string(),
        };
        StoreError::OperationFailed(message)
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::OperationFailed(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ids are opaque strings on the wire; anything that is not a UUID fails the
/// cast before reaching storage.
pub fn parse_id(id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| {
        StoreError::OperationFailed(format!(
            "Cast to UUID failed for value \"{}\" at path \"id\"",
            id
        ))
    })
}

/// Filter values that read as a finite number also match stored numbers
/// numerically, so `0.0000001` and `1e-7` select the same records.
pub fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All records matching every filter, ordered by the sort list, then by
    /// creation order.
    async fn find(&self, query: &ListQuery) -> StoreResult<Vec<Product>>;

    /// Store a validated record. Returns it with its assigned id.
    async fn insert(&self, product: NewProduct) -> StoreResult<Product>;

    /// Returns `Err(StoreError::NotFound)` if no record has this id.
    async fn find_by_id_and_update(&self, id: &str, patch: ProductPatch) -> StoreResult<Product>;

    /// Returns `Err(StoreError::NotFound)` if no record has this id.
    async fn find_by_id_and_delete(&self, id: &str) -> StoreResult<Product>;

    /// Sum of quantity and of quantity × price across all records. Zeros when
    /// the collection is empty.
    async fn report(&self) -> StoreResult<InventoryReport>;
}
