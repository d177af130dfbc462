//! PostgreSQL product store (sqlx).
//!
//! Prices are stored as `BIGINT` cents. Text search runs against the
//! generated `search_vector` column (GIN-indexed), so a search never falls
//! back to a sequential `LIKE` scan.

use crate::error::{Error, Result};
use crate::model::{Price, Product, ProductDraft};
use crate::query::ProductFilter;
use crate::repository::ProductStore;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

const COLUMNS: &str = "id, name, description, category, price_cents";

/// Product store over a PostgreSQL pool.
///
/// Build one per connection string: the primary and the replica are two
/// independent `PgProductStore` values.
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        PgProductStore { pool }
    }

    /// Connect eagerly.
    ///
    /// # Errors
    /// Returns `Err` if no connection can be established.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!("✓ Postgres store connected (pool size: {})", max_connections);
        Ok(PgProductStore { pool })
    }

    /// Build the pool without connecting; connections open on first use.
    ///
    /// # Errors
    /// Returns `Err` if the URL cannot be parsed.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)
            .map_err(|e| Error::ConfigError(format!("Invalid database URL: {}", e)))?;
        Ok(PgProductStore { pool })
    }

    /// Apply the bundled schema migrations. Only ever run against the primary.
    ///
    /// # Errors
    /// Returns `Err` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::StoreError(format!("Migration failed: {}", e)))?;
        info!("✓ Postgres migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_db_cents(price: Price) -> Result<i64> {
    i64::try_from(price.cents())
        .map_err(|_| Error::ValidationError(format!("price {} out of range", price)))
}

fn to_db_count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    let cents: i64 = row.try_get("price_cents")?;
    let cents = u64::try_from(cents)
        .map_err(|_| Error::StoreError(format!("negative price_cents {}", cents)))?;

    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        price: Price::from_cents(cents),
    })
}

/// Append `WHERE` clauses for every filter present.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) -> Result<()> {
    qb.push(" WHERE TRUE");
    if let Some(min) = filter.min_price {
        qb.push(" AND price_cents >= ").push_bind(to_db_cents(min)?);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND price_cents <= ").push_bind(to_db_cents(max)?);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(search) = &filter.search {
        qb.push(" AND search_vector @@ plainto_tsquery('simple', ")
            .push_bind(search.clone())
            .push(")");
    }
    Ok(())
}

impl ProductStore for PgProductStore {
    async fn fetch_by_id(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {} FROM products WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filter(&mut qb, filter)?;
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_page(
        &self,
        filter: &ProductFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM products", COLUMNS));
        push_filter(&mut qb, filter)?;
        qb.push(" ORDER BY id ASC LIMIT ")
            .push_bind(to_db_count(limit))
            .push(" OFFSET ")
            .push_bind(to_db_count(skip));

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(product_from_row).collect()
    }

    async fn insert(&self, draft: ProductDraft) -> Result<Product> {
        let row = sqlx::query(&format!(
            "INSERT INTO products (name, description, category, price_cents) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            COLUMNS
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(to_db_cents(draft.price)?)
        .fetch_one(&self.pool)
        .await?;
        product_from_row(&row)
    }

    async fn update(&self, id: i64, draft: ProductDraft) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "UPDATE products SET name = $2, description = $3, category = $4, price_cents = $5 \
             WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(to_db_cents(draft.price)?)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn delete(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(product_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(filter: &ProductFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filter(&mut qb, filter).expect("Failed to build filter");
        qb.sql().to_string()
    }

    #[test]
    fn test_empty_filter_sql() {
        assert_eq!(
            sql_for(&ProductFilter::default()),
            "SELECT COUNT(*) FROM products WHERE TRUE"
        );
    }

    #[test]
    fn test_full_filter_sql() {
        let filter = ProductFilter {
            min_price: Some(Price::from_units(20)),
            max_price: Some(Price::from_units(90)),
            category: Some("Category 1".to_string()),
            search: Some("lamp".to_string()),
        };
        assert_eq!(
            sql_for(&filter),
            "SELECT COUNT(*) FROM products WHERE TRUE AND price_cents >= $1 \
             AND price_cents <= $2 AND category = $3 \
             AND search_vector @@ plainto_tsquery('simple', $4)"
        );
    }

    #[tokio::test]
    async fn test_lazy_pool_rejects_bad_url() {
        let result = PgProductStore::connect_lazy("not a url", 1);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
