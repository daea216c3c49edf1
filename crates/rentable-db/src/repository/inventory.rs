//! # Inventory Repository
//!
//! Database operations for rentable units.
//!
//! There is deliberately no "decrement stock" operation anywhere in this
//! file: remaining availability is derived at read time from
//! reservation_lines (see the reservation repository), and `quantity` is
//! only ever the ceiling.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use rentable_core::{InventoryItem, ItemStatus};

/// Repository for inventory item database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets an item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT
                id, business_id, name, quantity, unit_price_cents,
                status, created_at, updated_at
            FROM inventory_items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists all AVAILABLE items for a business, the input set for the
    /// availability resolver.
    pub async fn list_available(&self, business_id: &str) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT
                id, business_id, name, quantity, unit_price_cents,
                status, created_at, updated_at
            FROM inventory_items
            WHERE business_id = ?1 AND status = 'available'
            ORDER BY name
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Inserts an item.
    pub async fn insert(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, quantity = item.quantity, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, business_id, name, quantity, unit_price_cents,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.business_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.status)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Changes an item's operational status (maintenance, retirement).
    ///
    /// Existing reservations are untouched; the item merely stops
    /// appearing in new availability results while not `available`.
    pub async fn set_status(&self, id: &str, status: ItemStatus) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET status = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
