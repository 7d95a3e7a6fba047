//! # Product Repository
//!
//! Read access to the catalog for cart pricing.
//!
//! Catalog management is owned by another system; `insert` exists so the
//! seed binary and tests can populate a local catalog.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use caixa_core::Product;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_id("uuid-here").await?;
/// cart.add_item(&product, 1, None)?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, is_weighable,
                   unit_price_cents, price_per_kg_cents, is_active,
                   created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Active products of a tenant ordered by name.
    pub async fn list_active(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        debug!(tenant_id = %tenant_id, limit, "Listing active products");

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, is_weighable,
                   unit_price_cents, price_per_kg_cents, is_active,
                   created_at, updated_at
            FROM products
            WHERE tenant_id = ?1 AND is_active = 1
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(tenant_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, is_weighable,
                unit_price_cents, price_per_kg_cents, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(product.is_weighable)
        .bind(product.unit_price_cents)
        .bind(product.price_per_kg_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds an active catalog product priced per unit or per kilogram.
pub fn new_product(tenant_id: &str, name: &str, is_weighable: bool, price_cents: i64) -> Product {
    let now = Utc::now();
    Product {
        id: generate_product_id(),
        tenant_id: tenant_id.to_string(),
        name: name.to_string(),
        is_weighable,
        unit_price_cents: if is_weighable { 0 } else { price_cents },
        price_per_kg_cents: if is_weighable { price_cents } else { 0 },
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use caixa_core::DEFAULT_TENANT_ID;

    #[tokio::test]
    async fn test_insert_and_list_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let cheese = repo
            .insert(&new_product(DEFAULT_TENANT_ID, "Queijo minas", true, 5_000))
            .await
            .unwrap();
        repo.insert(&new_product(DEFAULT_TENANT_ID, "Agua 500ml", false, 350))
            .await
            .unwrap();

        let mut inactive = new_product(DEFAULT_TENANT_ID, "Descontinuado", false, 100);
        inactive.is_active = false;
        repo.insert(&inactive).await.unwrap();

        let loaded = repo.get_by_id(&cheese.id).await.unwrap().unwrap();
        assert!(loaded.is_weighable);
        assert_eq!(loaded.price_per_kg_cents, 5_000);

        let active = repo.list_active(DEFAULT_TENANT_ID, 10).await.unwrap();
        let names: Vec<_> = active.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Agua 500ml", "Queijo minas"]);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }
}
