//! # External Gateways
//!
//! Trait seams for the billing provider and the e-signature provider.
//! The engine only ever needs to void or refund things it previously
//! created through other channels; creation itself happens upstream and
//! arrives here as external IDs on correlation rows.
//!
//! All calls run under [`EngineConfig::external_call_timeout`] and are
//! best-effort from the booking state machine's point of view: a failed
//! void is logged and the local transition proceeds.
//!
//! [`EngineConfig::external_call_timeout`]: crate::config::EngineConfig

use async_trait::async_trait;

/// Outcome of a gateway call, opaque beyond success/failure.
pub type GatewayResult = Result<(), String>;

/// Billing provider operations the engine invokes.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Voids an open invoice by its provider-side ID.
    async fn void_invoice(&self, external_id: &str) -> GatewayResult;

    /// Voids an open quote by its provider-side ID.
    async fn void_quote(&self, external_id: &str) -> GatewayResult;

    /// Refunds a captured payment by its provider-side ID.
    async fn refund_payment(&self, external_id: &str, amount_cents: i64) -> GatewayResult;
}

/// E-signature provider operations the engine invokes.
#[async_trait]
pub trait DocumentSigner: Send + Sync {
    /// Voids an outstanding signature envelope.
    async fn void_envelope(&self, external_id: &str) -> GatewayResult;
}

// =============================================================================
// In-memory double
// =============================================================================

/// Records gateway calls instead of making them. Used by tests and by
/// deployments that run billing-less.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    calls: tokio::sync::Mutex<Vec<String>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        MemoryGateway::default()
    }

    /// Makes every subsequent call fail.
    pub fn fail_all(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Returns the calls recorded so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: String) -> GatewayResult {
        self.calls.lock().await.push(call);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err("injected gateway failure".to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MemoryGateway {
    async fn void_invoice(&self, external_id: &str) -> GatewayResult {
        self.record(format!("void_invoice:{external_id}")).await
    }

    async fn void_quote(&self, external_id: &str) -> GatewayResult {
        self.record(format!("void_quote:{external_id}")).await
    }

    async fn refund_payment(&self, external_id: &str, amount_cents: i64) -> GatewayResult {
        self.record(format!("refund_payment:{external_id}:{amount_cents}"))
            .await
    }
}

#[async_trait]
impl DocumentSigner for MemoryGateway {
    async fn void_envelope(&self, external_id: &str) -> GatewayResult {
        self.record(format!("void_envelope:{external_id}")).await
    }
}
