//! In-process store used by the router tests. Mirrors the ordering and
//! matching rules of the PostgreSQL backend.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{parse_id, parse_number, ProductStore, StoreError, StoreResult};
use crate::models::{
    Field, InventoryReport, ListQuery, NewProduct, Product, ProductPatch, SortDirection,
};

/// Records in insertion order.
#[derive(Debug, Default)]
pub struct MemoryProductStore {
    products: RwLock<Vec<Product>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Comparable value of a field, `None` when the record lacks it.
#[derive(Debug, Clone, PartialEq)]
enum Sortable<'a> {
    Text(&'a str),
    Integer(i64),
    Float(f64),
    Time(DateTime<Utc>),
    Json(&'a Value),
}

fn field<'a>(product: &'a Product, key: &str) -> Option<Sortable<'a>> {
    match Field::parse(key) {
        Field::Id => None,
        Field::Name => Some(Sortable::Text(&product.name)),
        Field::Quantity => Some(Sortable::Integer(product.quantity)),
        Field::Price => Some(Sortable::Float(product.price)),
        Field::CreatedAt => Some(Sortable::Time(product.created_at)),
        Field::UpdatedAt => Some(Sortable::Time(product.updated_at)),
        Field::Attribute(name) => product.attributes.get(name).map(Sortable::Json),
    }
}

/// Equality filter on one field. Integers and attributes match on their
/// text form; numeric values also match numerically. Null or missing never
/// matches. Id filters are validated before this is called.
fn filter_matches(product: &Product, key: &str, value: &str) -> bool {
    match Field::parse(key) {
        Field::Id => parse_id(value).map(|id| id == product.id).unwrap_or(false),
        Field::Name => product.name == value,
        Field::Quantity => product.quantity.to_string() == value,
        Field::Price => parse_number(value) == Some(product.price),
        Field::CreatedAt => product.created_at.to_rfc3339() == value,
        Field::UpdatedAt => product.updated_at.to_rfc3339() == value,
        Field::Attribute(name) => match product.attributes.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => s == value,
            Some(Value::Number(n)) => {
                n.to_string() == value
                    || parse_number(value).is_some_and(|v| n.as_f64() == Some(v))
            }
            Some(other) => other.to_string() == value,
        },
    }
}

fn json_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => json_rank(a).cmp(&json_rank(b)),
    }
}

fn compare(a: &Option<Sortable<'_>>, b: &Option<Sortable<'_>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => match (x, y) {
            (Sortable::Text(x), Sortable::Text(y)) => x.cmp(y),
            (Sortable::Integer(x), Sortable::Integer(y)) => x.cmp(y),
            (Sortable::Float(x), Sortable::Float(y)) => x.total_cmp(y),
            (Sortable::Time(x), Sortable::Time(y)) => x.cmp(y),
            (Sortable::Json(x), Sortable::Json(y)) => compare_json(x, y),
            _ => Ordering::Equal,
        },
    }
}

fn compare_products(a: &Product, b: &Product, query: &ListQuery) -> Ordering {
    for key in &query.sort {
        let ordering = if matches!(Field::parse(&key.field), Field::Id) {
            a.id.cmp(&b.id)
        } else {
            compare(&field(a, &key.field), &field(b, &key.field))
        };
        let ordering = match key.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn apply_patch(product: &mut Product, patch: ProductPatch) {
    if let Some(name) = patch.name {
        product.name = name;
    }
    if let Some(quantity) = patch.quantity {
        product.quantity = quantity;
    }
    if let Some(price) = patch.price {
        product.price = price;
    }
    product.attributes.extend(patch.attributes);
    product.updated_at = Utc::now();
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn find(&self, query: &ListQuery) -> StoreResult<Vec<Product>> {
        for (key, value) in &query.filters {
            if Field::parse(key) == Field::Id {
                parse_id(value)?;
            }
        }

        let products = self.products.read().await;
        let mut matches: Vec<Product> = products
            .iter()
            .filter(|p| {
                query
                    .filters
                    .iter()
                    .all(|(key, value)| filter_matches(p, key, value))
            })
            .cloned()
            .collect();
        // Stable sort keeps insertion order for ties.
        matches.sort_by(|a, b| compare_products(a, b, query));
        Ok(matches)
    }

    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        let now = Utc::now();
        let stored = Product {
            id: Uuid::new_v4(),
            name: product.name,
            quantity: product.quantity,
            price: product.price,
            attributes: product.attributes,
            created_at: now,
            updated_at: now,
        };
        self.products.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id_and_update(&self, id: &str, patch: ProductPatch) -> StoreResult<Product> {
        let id = parse_id(id)?;
        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        apply_patch(product, patch);
        Ok(product.clone())
    }

    async fn find_by_id_and_delete(&self, id: &str) -> StoreResult<Product> {
        let id = parse_id(id)?;
        let mut products = self.products.write().await;
        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        Ok(products.remove(index))
    }

    async fn report(&self) -> StoreResult<InventoryReport> {
        let products = self.products.read().await;
        Ok(products
            .iter()
            .fold(InventoryReport::default(), |mut report, p| {
                report.total_quantity += p.quantity;
                report.total_value += p.quantity as f64 * p.price;
                report
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_product(name: &str, quantity: i64, price: f64, extra: Value) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            quantity,
            price,
            attributes: match extra {
                Value::Object(map) => map,
                _ => Default::default(),
            },
        }
    }

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        ListQuery::from_params(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn insert_assigns_distinct_ids() {
        let store = MemoryProductStore::new();
        let a = store.insert(new_product("A", 1, 1.0, json!({}))).await.unwrap();
        let b = store.insert(new_product("A", 1, 1.0, json!({}))).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn numeric_filters_match_text_form() {
        let store = MemoryProductStore::new();
        store.insert(new_product("A", 5, 2.5, json!({ "rack": 3 }))).await.unwrap();
        store.insert(new_product("B", 6, 2.0, json!({}))).await.unwrap();

        let found = store.find(&query(&[("quantity", "5")])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "A");

        let found = store.find(&query(&[("price", "2")])).await.unwrap();
        assert_eq!(found[0].name, "B");

        let found = store.find(&query(&[("rack", "3")])).await.unwrap();
        assert_eq!(found[0].name, "A");
    }

    #[tokio::test]
    async fn price_filter_compares_numerically() {
        let store = MemoryProductStore::new();
        store.insert(new_product("tiny", 1, 0.0000001, json!({}))).await.unwrap();
        store.insert(new_product("huge", 1, 1e21, json!({}))).await.unwrap();

        let found = store.find(&query(&[("price", "1e-7")])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "tiny");

        let found = store.find(&query(&[("price", "1000000000000000000000")])).await.unwrap();
        assert_eq!(found[0].name, "huge");

        assert!(store.find(&query(&[("price", "cheap")])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_id_filter_fails_even_when_empty() {
        let store = MemoryProductStore::new();
        let err = store.find(&query(&[("id", "abc")])).await.unwrap_err();
        assert!(matches!(err, StoreError::OperationFailed(ref m) if m.contains("abc")));
    }

    #[tokio::test]
    async fn text_sort_is_bytewise() {
        let store = MemoryProductStore::new();
        for name in ["apple", "Banana", "cherry"] {
            store.insert(new_product(name, 1, 1.0, json!({ "color": name }))).await.unwrap();
        }

        let by_name = store.find(&query(&[("sort", "name")])).await.unwrap();
        let names: Vec<&str> = by_name.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Banana", "apple", "cherry"]);

        let by_color = store.find(&query(&[("sort", "-color")])).await.unwrap();
        let names: Vec<&str> = by_color.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cherry", "apple", "Banana"]);
    }

    #[tokio::test]
    async fn missing_attribute_sorts_first_ascending_last_descending() {
        let store = MemoryProductStore::new();
        store.insert(new_product("with", 1, 1.0, json!({ "color": "red" }))).await.unwrap();
        store.insert(new_product("without", 1, 1.0, json!({}))).await.unwrap();

        let asc = store.find(&query(&[("sort", "color")])).await.unwrap();
        assert_eq!(asc[0].name, "without");

        let desc = store.find(&query(&[("sort", "-color")])).await.unwrap();
        assert_eq!(desc[0].name, "with");
    }

    #[tokio::test]
    async fn update_merges_attributes_and_bumps_updated_at() {
        let store = MemoryProductStore::new();
        let created = store
            .insert(new_product("A", 1, 1.0, json!({ "category": "tools", "color": "red" })))
            .await
            .unwrap();

        let patch = ProductPatch {
            quantity: Some(7),
            attributes: match json!({ "color": "blue" }) {
                Value::Object(map) => map,
                _ => unreachable!(),
            },
            ..Default::default()
        };
        let updated = store
            .find_by_id_and_update(&created.id.to_string(), patch)
            .await
            .unwrap();

        assert_eq!(updated.name, "A");
        assert_eq!(updated.quantity, 7);
        assert_eq!(updated.attributes.get("category"), Some(&json!("tools")));
        assert_eq!(updated.attributes.get("color"), Some(&json!("blue")));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn report_on_empty_store_is_zero() {
        let store = MemoryProductStore::new();
        assert_eq!(store.report().await.unwrap(), InventoryReport::default());
    }
}
