use axum::{http::StatusCode, response::IntoResponse};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::warn;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);

            // Initialize metrics with zero values
            counter!("whois_lookups_total", "data_type" => "domain").absolute(0);
            counter!("whois_lookups_total", "data_type" => "contact").absolute(0);
            counter!("whois_cache_hits_total").absolute(0);
            counter!("whois_cache_misses_total").absolute(0);
            gauge!("whois_cache_entries").set(0.0);
            histogram!("whois_lookup_duration_seconds").record(0.0);
        }
        Err(e) => {
            warn!("Failed to install metrics recorder: {}", e);
        }
    }
}

pub fn increment_lookups(data_type: &str) {
    counter!("whois_lookups_total", "data_type" => data_type.to_string()).increment(1);
}

pub fn increment_cache_hits() {
    counter!("whois_cache_hits_total").increment(1);
}

pub fn increment_cache_misses() {
    counter!("whois_cache_misses_total").increment(1);
}

pub fn increment_errors(code: &str) {
    counter!("whois_errors_total", "code" => code.to_string()).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("whois_cache_entries").set(entries as f64);
}

pub fn record_lookup_time(duration_ms: u64) {
    let duration_seconds = duration_ms as f64 / 1000.0;
    histogram!("whois_lookup_duration_seconds").record(duration_seconds);
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized".to_string()),
    }
}
