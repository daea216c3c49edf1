//! # Business Repository
//!
//! Database operations for tenant configuration.
//!
//! Businesses are created at onboarding and updated by tenant admins; they
//! are never deleted while reservations reference them, so there is no
//! delete here at all.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use rentable_core::Business;

/// Repository for business (tenant) database operations.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    /// Creates a new BusinessRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    /// Gets a business by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Business>> {
        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id, name, timezone,
                min_notice_hours, max_notice_hours,
                pre_buffer_hours, post_buffer_hours,
                min_total_cents,
                created_at, updated_at
            FROM businesses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(business)
    }

    /// Inserts a business (tenant onboarding, seeding).
    pub async fn insert(&self, business: &Business) -> DbResult<()> {
        debug!(id = %business.id, name = %business.name, "Inserting business");

        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, name, timezone,
                min_notice_hours, max_notice_hours,
                pre_buffer_hours, post_buffer_hours,
                min_total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.timezone)
        .bind(business.min_notice_hours)
        .bind(business.max_notice_hours)
        .bind(business.pre_buffer_hours)
        .bind(business.post_buffer_hours)
        .bind(business.min_total_cents)
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the booking policy fields (tenant admin action).
    pub async fn update_policy(
        &self,
        id: &str,
        timezone: &str,
        min_notice_hours: i64,
        max_notice_hours: i64,
        pre_buffer_hours: i64,
        post_buffer_hours: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE businesses SET
                timezone = ?2,
                min_notice_hours = ?3,
                max_notice_hours = ?4,
                pre_buffer_hours = ?5,
                post_buffer_hours = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(timezone)
        .bind(min_notice_hours)
        .bind(max_notice_hours)
        .bind(pre_buffer_hours)
        .bind(post_buffer_hours)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Business", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
