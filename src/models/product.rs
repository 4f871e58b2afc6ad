use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Free-form fields stored alongside the schema fields.
pub type Attributes = Map<String, Value>;

/// Keys owned by storage; never taken from a request body.
pub const RESERVED_KEYS: &[&str] = &["id", "_id", "created_at", "updated_at"];

/// Core product record. Schema fields are typed, everything else rides along
/// in `attributes` and is flattened into the JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    #[serde(flatten)]
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Schema validation ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: &'static str,
    pub message: String,
}

impl FieldError {
    fn required(path: &'static str) -> Self {
        Self {
            path,
            message: format!("Path `{}` is required.", path),
        }
    }

    fn cast(path: &'static str, kind: &str, value: &Value) -> Self {
        Self {
            path,
            message: format!("Cast to {} failed for value {} at path \"{}\"", kind, value, path),
        }
    }

    fn not_integer(path: &'static str, value: &Value) -> Self {
        Self {
            path,
            message: format!("Path `{}` ({}) is not an integer.", path, value),
        }
    }

    fn below_minimum(path: &'static str, value: &Value) -> Self {
        Self {
            path,
            message: format!(
                "Path `{}` ({}) is less than minimum allowed value (0).",
                path, value
            ),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Product validation failed: {}", join(.0))]
    Document(Vec<FieldError>),
    #[error("Validation failed: {}", join(.0))]
    Update(Vec<FieldError>),
}

fn check_name(value: &Value) -> Result<String, FieldError> {
    match value {
        Value::Null => Err(FieldError::required("name")),
        Value::String(s) if s.is_empty() => Err(FieldError::required("name")),
        Value::String(s) => Ok(s.clone()),
        other => Err(FieldError::cast("name", "string", other)),
    }
}

fn check_quantity(value: &Value) -> Result<i64, FieldError> {
    let number = match value {
        Value::Null => return Err(FieldError::required("quantity")),
        Value::Number(n) => n,
        other => return Err(FieldError::cast("quantity", "Number", other)),
    };

    let quantity = match number.as_i64() {
        Some(q) => q,
        None => match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => f as i64,
            _ => return Err(FieldError::not_integer("quantity", value)),
        },
    };

    if quantity < 0 {
        return Err(FieldError::below_minimum("quantity", value));
    }
    Ok(quantity)
}

fn check_price(value: &Value) -> Result<f64, FieldError> {
    let price = match value {
        Value::Null => return Err(FieldError::required("price")),
        Value::Number(n) => n
            .as_f64()
            .filter(|p| p.is_finite())
            .ok_or_else(|| FieldError::cast("price", "Number", value))?,
        other => return Err(FieldError::cast("price", "Number", other)),
    };

    if price < 0.0 {
        return Err(FieldError::below_minimum("price", value));
    }
    Ok(price)
}

/// Split a request document into schema fields and free-form attributes.
/// Reserved keys are dropped.
fn split_document(mut doc: Attributes) -> (Option<Value>, Option<Value>, Option<Value>, Attributes) {
    for key in RESERVED_KEYS {
        doc.remove(*key);
    }
    let name = doc.remove("name");
    let quantity = doc.remove("quantity");
    let price = doc.remove("price");
    (name, quantity, price, doc)
}

// ── Request payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub attributes: Attributes,
}

impl NewProduct {
    /// Validate a whole document. Every failing schema field is reported.
    pub fn from_document(doc: Attributes) -> Result<Self, ValidationError> {
        let (name, quantity, price, attributes) = split_document(doc);
        let mut errors = Vec::new();

        let name = check_name(name.as_ref().unwrap_or(&Value::Null))
            .map_err(|e| errors.push(e))
            .ok();
        let quantity = check_quantity(quantity.as_ref().unwrap_or(&Value::Null))
            .map_err(|e| errors.push(e))
            .ok();
        let price = check_price(price.as_ref().unwrap_or(&Value::Null))
            .map_err(|e| errors.push(e))
            .ok();

        match (name, quantity, price) {
            (Some(name), Some(quantity), Some(price)) => Ok(Self {
                name,
                quantity,
                price,
                attributes,
            }),
            _ => Err(ValidationError::Document(errors)),
        }
    }
}

/// Partial update. Absent schema fields keep their stored value; attributes
/// are merged key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<f64>,
    pub attributes: Attributes,
}

impl ProductPatch {
    /// Validate only the fields present in the document.
    pub fn from_document(doc: Attributes) -> Result<Self, ValidationError> {
        let (name, quantity, price, attributes) = split_document(doc);
        let mut errors = Vec::new();

        let name = name.and_then(|v| check_name(&v).map_err(|e| errors.push(e)).ok());
        let quantity = quantity.and_then(|v| check_quantity(&v).map_err(|e| errors.push(e)).ok());
        let price = price.and_then(|v| check_price(&v).map_err(|e| errors.push(e)).ok());

        if !errors.is_empty() {
            return Err(ValidationError::Update(errors));
        }

        Ok(Self {
            name,
            quantity,
            price,
            attributes,
        })
    }
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub total_quantity: i64,
    pub total_value: f64,
}
