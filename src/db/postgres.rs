use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{parse_id, parse_number, ProductStore, StoreError, StoreResult};
use crate::models::{
    Attributes, Field, InventoryReport, ListQuery, NewProduct, Product, ProductPatch, SortDirection,
};

const COLUMNS: &str = "id, name, quantity, price, attributes, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    quantity: i64,
    price: f64,
    attributes: Json<Attributes>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            quantity: row.quantity,
            price: row.price,
            attributes: row.attributes.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Products in PostgreSQL: schema fields as typed columns, everything else in
/// the `attributes` JSONB column.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append `WHERE` equality clauses. Integers and attributes are compared
/// through their text form so raw query strings match them; numeric values
/// also match numerically. An id filter must be a valid UUID.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) -> StoreResult<()> {
    for (i, (key, value)) in query.filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match Field::parse(key) {
            Field::Id => {
                qb.push("id = ").push_bind(parse_id(value)?);
            }
            Field::Name => {
                qb.push("name = ").push_bind(value.clone());
            }
            Field::Quantity => {
                qb.push("quantity::text = ").push_bind(value.clone());
            }
            Field::Price => match parse_number(value) {
                Some(number) => {
                    qb.push("price = ").push_bind(number);
                }
                None => {
                    qb.push("FALSE");
                }
            },
            Field::CreatedAt => {
                qb.push("created_at = ").push_bind(value.clone()).push("::timestamptz");
            }
            Field::UpdatedAt => {
                qb.push("updated_at = ").push_bind(value.clone()).push("::timestamptz");
            }
            Field::Attribute(name) => {
                qb.push("(attributes ->> ")
                    .push_bind(name.to_string())
                    .push(" = ")
                    .push_bind(value.clone());
                if let Some(number) = parse_number(value) {
                    qb.push(" OR CASE WHEN jsonb_typeof(attributes -> ")
                        .push_bind(name.to_string())
                        .push(") = 'number' THEN (attributes ->> ")
                        .push_bind(name.to_string())
                        .push(")::float8 = ")
                        .push_bind(number)
                        .push(" ELSE FALSE END");
                }
                qb.push(")");
            }
        }
    }
    Ok(())
}

/// Append `ORDER BY`. Text sorts bytewise (`COLLATE "C"`) whatever the
/// database locale. Attributes sort by JSON type first (null, string, number,
/// boolean, array, object), then by value within strings, numbers and
/// booleans. Missing attributes sort first ascending, last descending;
/// creation order breaks remaining ties.
fn push_sort(qb: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    qb.push(" ORDER BY ");
    for key in &query.sort {
        let direction = match key.direction {
            SortDirection::Ascending => " ASC NULLS FIRST, ",
            SortDirection::Descending => " DESC NULLS LAST, ",
        };
        match Field::parse(&key.field) {
            Field::Id => {
                qb.push("id");
            }
            Field::Name => {
                qb.push("name COLLATE \"C\"");
            }
            Field::Quantity => {
                qb.push("quantity");
            }
            Field::Price => {
                qb.push("price");
            }
            Field::CreatedAt => {
                qb.push("created_at");
            }
            Field::UpdatedAt => {
                qb.push("updated_at");
            }
            Field::Attribute(name) => {
                qb.push("CASE jsonb_typeof(attributes -> ")
                    .push_bind(name.to_string())
                    .push(
                        ") WHEN 'null' THEN 0 WHEN 'string' THEN 1 WHEN 'number' THEN 2 \
                         WHEN 'boolean' THEN 3 WHEN 'array' THEN 4 WHEN 'object' THEN 5 END",
                    )
                    .push(direction);
                qb.push("(CASE WHEN jsonb_typeof(attributes -> ")
                    .push_bind(name.to_string())
                    .push(") = 'string' THEN attributes ->> ")
                    .push_bind(name.to_string())
                    .push(" END) COLLATE \"C\"")
                    .push(direction);
                qb.push("CASE WHEN jsonb_typeof(attributes -> ")
                    .push_bind(name.to_string())
                    .push(") = 'number' THEN (attributes ->> ")
                    .push_bind(name.to_string())
                    .push(")::float8 END")
                    .push(direction);
                qb.push("CASE WHEN jsonb_typeof(attributes -> ")
                    .push_bind(name.to_string())
                    .push(") = 'boolean' THEN (attributes -> ")
                    .push_bind(name.to_string())
                    .push(")::boolean END");
            }
        }
        qb.push(direction);
    }
    qb.push("created_at ASC, id ASC");
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find(&self, query: &ListQuery) -> StoreResult<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM products", COLUMNS));
        push_filters(&mut qb, query)?;
        push_sort(&mut qb, query);

        let rows = qb.build_query_as::<ProductRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, quantity, price, attributes)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&product.name)
        .bind(product.quantity)
        .bind(product.price)
        .bind(Json(&product.attributes))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id_and_update(&self, id: &str, patch: ProductPatch) -> StoreResult<Product> {
        let id = parse_id(id)?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name       = COALESCE($1, name),
                quantity   = COALESCE($2, quantity),
                price      = COALESCE($3, price),
                attributes = attributes || $4,
                updated_at = $5
            WHERE id = $6
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(patch.name.as_deref())
        .bind(patch.quantity)
        .bind(patch.price)
        .bind(Json(&patch.attributes))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    async fn find_by_id_and_delete(&self, id: &str) -> StoreResult<Product> {
        let id = parse_id(id)?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    async fn report(&self) -> StoreResult<InventoryReport> {
        let (total_quantity, total_value): (i64, f64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::bigint            AS total_quantity,
                   COALESCE(SUM(quantity * price), 0)::float8    AS total_value
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(InventoryReport {
            total_quantity,
            total_value,
        })
    }
}
