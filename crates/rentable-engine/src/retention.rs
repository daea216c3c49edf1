//! # Retention Sweeper
//!
//! Hard-deletes EXPIRED reservations that have sat untouched past the
//! retention grace period. Expired bookings carry no financial record
//! worth keeping (their invoices were voided at expiry), so they are the
//! only status the purge touches. Cancelled and completed reservations
//! stay forever.
//!
//! Each purge runs in its own transaction, deleting dependents before the
//! reservation row. A failed purge is logged and retried on the next pass.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use rentable_db::Database;

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Purges long-expired reservations.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    db: Database,
    config: EngineConfig,
}

impl RetentionSweeper {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        RetentionSweeper { db, config }
    }

    /// Runs one purge pass at `now`. Returns the number of reservations
    /// deleted. Only rows EXPIRED before `now - retention_grace` qualify.
    pub async fn purge(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let threshold = now - self.config.retention_grace;
        let repo = self.db.reservations();
        let candidates = repo
            .select_expired_older_than(threshold, self.config.sweep_batch_size)
            .await?;

        if candidates.is_empty() {
            debug!("Retention pass found nothing to purge");
            return Ok(0);
        }

        let mut purged = 0usize;
        for reservation in candidates {
            let result: EngineResult<()> = async {
                let mut tx = self.db.begin().await?;
                repo.purge_tx(&mut tx, &reservation.id).await?;
                tx.commit().await?;
                Ok(())
            }
            .await;

            match result {
                Ok(()) => {
                    purged += 1;
                    info!(
                        reservation_id = %reservation.id,
                        business_id = %reservation.business_id,
                        expired_at = %reservation.updated_at,
                        "Reservation purged"
                    );
                }
                Err(err) => {
                    error!(reservation_id = %reservation.id, %err, "Failed to purge reservation");
                }
            }
        }

        info!(purged, %threshold, "Retention pass finished");
        Ok(purged)
    }
}
