//! Prometheus metrics exposition
//!
//! Registers and exposes the service's operational metrics:
//!
//! - `conflict_checks_total` (counter): label `outcome` (`conflicts`,
//!   `clear`, `error`)
//! - `conflict_check_duration_seconds` (histogram): label `outcome`
//! - `corpus_refreshes_total` (counter): label `trigger` (`check`, `manual`)
//! - `oauth_token_refreshes_total` (counter): label `outcome`, emitted by
//!   the auth session when it exercises the refresh grant

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `conflict_check_duration_seconds` with explicit histogram
/// buckets so it renders `_bucket` lines for `histogram_quantile()` queries
/// rather than the default summary. A check can ride a cold multi-page
/// corpus fetch, so the buckets run from 5ms (cache hit) up to 60s.
///
/// The handle's `render()` method produces the Prometheus text exposition
/// format suitable for serving on a `/metrics` endpoint.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "conflict_check_duration_seconds".to_string(),
            ),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
            ],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed conflict check with its outcome label.
pub fn record_check(outcome: &str, duration_secs: f64) {
    metrics::counter!("conflict_checks_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("conflict_check_duration_seconds", "outcome" => outcome.to_string())
        .record(duration_secs);
}

/// Record a corpus fetch with what triggered it.
pub fn record_corpus_refresh(trigger: &'static str) {
    metrics::counter!("corpus_refreshes_total", "trigger" => trigger).increment(1);
}
