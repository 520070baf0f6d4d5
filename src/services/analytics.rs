use crate::models::Stats;
use crate::services::pricing::units_to_usd;
use crate::services::verifier::{PaymentError, PaymentProof};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-local counters for the stats endpoint.
pub struct Analytics {
    requests_total: AtomicU64,
    payments_total: AtomicU64,
    revenue_units: AtomicU64,
    rejections: DashMap<&'static str, u64>,
    start_time: Instant,
}

impl Analytics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            payments_total: AtomicU64::new(0),
            revenue_units: AtomicU64::new(0),
            rejections: DashMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::SeqCst);
    }

    /// Revenue counts what the caller was charged, not any overpayment on top.
    pub fn record_payment(&self, proof: &PaymentProof, endpoint: &str) {
        self.payments_total.fetch_add(1, Ordering::SeqCst);
        self.revenue_units
            .fetch_add(proof.required_units, Ordering::SeqCst);

        tracing::info!(
            "Payment recorded: ${} from {:?} for {} (tx: {})",
            units_to_usd(proof.required_units),
            proof.payer,
            endpoint,
            proof.tx_hash
        );
    }

    pub fn record_rejection(&self, error: &PaymentError) {
        *self.rejections.entry(error.kind()).or_insert(0) += 1;
    }

    pub fn get_stats(&self, consumed_references: usize) -> Stats {
        let revenue_units = self.revenue_units.load(Ordering::SeqCst);
        let rejections: BTreeMap<String, u64> = self
            .rejections
            .iter()
            .map(|entry| (entry.key().to_string(), *entry.value()))
            .collect();

        Stats {
            requests_total: self.requests_total.load(Ordering::SeqCst),
            payments_granted: self.payments_total.load(Ordering::SeqCst),
            payments_rejected: rejections.values().sum(),
            rejections_by_kind: rejections,
            revenue_units,
            revenue_usd: units_to_usd(revenue_units),
            consumed_references,
            uptime_seconds: self.uptime_seconds(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}
