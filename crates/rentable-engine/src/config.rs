//! Engine tuning knobs with production defaults.

use chrono::Duration;

/// Configuration for the booking engine and its background sweeps.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a fresh hold reserves inventory before the sweeper may
    /// reclaim it.
    pub hold_ttl: Duration,
    /// Deadline attached when an invoice is issued without its own
    /// expiry from the billing provider.
    pub invoice_ttl: Duration,
    /// How long EXPIRED reservations are kept before the retention sweep
    /// purges them.
    pub retention_grace: Duration,
    /// Upper bound on any single external gateway call.
    pub external_call_timeout: std::time::Duration,
    /// Maximum rows processed per sweep pass.
    pub sweep_batch_size: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hold_ttl: Duration::minutes(30),
            invoice_ttl: Duration::hours(48),
            retention_grace: Duration::days(30),
            external_call_timeout: std::time::Duration::from_secs(10),
            sweep_batch_size: 100,
        }
    }
}

impl EngineConfig {
    /// Sets the hold TTL.
    pub fn with_hold_ttl(mut self, ttl: Duration) -> Self {
        self.hold_ttl = ttl;
        self
    }

    /// Sets the invoice TTL.
    pub fn with_invoice_ttl(mut self, ttl: Duration) -> Self {
        self.invoice_ttl = ttl;
        self
    }

    /// Sets the retention grace period.
    pub fn with_retention_grace(mut self, grace: Duration) -> Self {
        self.retention_grace = grace;
        self
    }

    /// Sets the sweep batch size.
    pub fn with_sweep_batch_size(mut self, size: i64) -> Self {
        self.sweep_batch_size = size;
        self
    }
}
