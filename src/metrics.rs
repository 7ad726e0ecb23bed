//! Prometheus metrics & middleware helper.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts};

use crate::error::{EngineError, EngineResult};

/// Global Prometheus handle; exposes `/metrics` and records per-endpoint
/// request counts and latencies.
pub static METRICS: Lazy<PrometheusMetrics> = Lazy::new(|| {
    PrometheusMetricsBuilder::new("clubhouse")
        .endpoint("/metrics") // exposed URL
        .build()
        .expect("metrics builder")
});

/// Engine write outcomes, labelled by operation and result class.
///
/// - **Name**: `clubhouse_ledger_operations_total`
/// - **Labels**: `op` (e.g. `leave_club`), `outcome` (`ok`, `conflict`, ...)
pub static LEDGER_OPS: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "clubhouse_ledger_operations_total",
            "Engine write operations by outcome",
        ),
        &["op", "outcome"],
    )
    .expect("ledger counter opts");
    if let Err(e) = METRICS.registry.register(Box::new(counter.clone())) {
        log::warn!("ledger counter not exported: {e}");
    }
    counter
});

fn outcome_label<T>(res: &EngineResult<T>) -> &'static str {
    match res {
        Ok(_) => "ok",
        Err(EngineError::NotFound(_)) => "not_found",
        Err(EngineError::Unauthorized(_)) => "unauthorized",
        Err(EngineError::Unauthenticated(_)) => "unauthenticated",
        Err(EngineError::Conflict(_)) => "conflict",
        Err(EngineError::Invalid(_)) => "invalid",
        Err(e) if e.is_contention() => "contention",
        Err(_) => "error",
    }
}

pub fn record_ledger_op<T>(op: &str, res: &EngineResult<T>) {
    LEDGER_OPS
        .with_label_values(&[op, outcome_label(res)])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;

    #[test]
    fn outcomes_are_counted_per_class() {
        let before = LEDGER_OPS.with_label_values(&["unit_op", "conflict"]).get();
        record_ledger_op::<()>("unit_op", &Err(EngineError::conflict("x")));
        record_ledger_op::<()>(
            "unit_op",
            &Err(EngineError::Store(StoreError::Contention("x".into()))),
        );
        record_ledger_op("unit_op", &Ok(()));

        assert_eq!(
            LEDGER_OPS.with_label_values(&["unit_op", "conflict"]).get(),
            before + 1
        );
        assert!(LEDGER_OPS.with_label_values(&["unit_op", "contention"]).get() >= 1);
        assert!(LEDGER_OPS.with_label_values(&["unit_op", "ok"]).get() >= 1);
    }

    #[test]
    fn counter_is_exported_with_http_metrics() {
        record_ledger_op("unit_export", &Ok(()));
        let families = METRICS.registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "clubhouse_ledger_operations_total"));
    }
}
