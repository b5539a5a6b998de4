use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::fs;
use std::path::Path;

/// Metric name prefix for all harvest metrics
const PREFIX: &str = "catalog_harvest";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Upstream API
    pub static ref API_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_api_requests_total"), "Total upstream API requests"),
        &["endpoint", "status"]
    ).expect("Failed to create api_requests_total metric");

    pub static ref API_RETRIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_api_retries_total"), "Upstream API requests retried after a transient failure"),
        &["endpoint"]
    ).expect("Failed to create api_retries_total metric");

    // Sinks
    pub static ref ROWS_EXPORTED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_rows_exported_total"), "Rows written to flat files"),
        &["table"]
    ).expect("Failed to create rows_exported_total metric");

    pub static ref ROWS_UPSERTED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_rows_upserted_total"), "Rows inserted or updated in the database"),
        &["table"]
    ).expect("Failed to create rows_upserted_total metric");

    pub static ref ROW_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_row_failures_total"), "Rows rejected by the database during upsert"),
        &["table"]
    ).expect("Failed to create row_failures_total metric");
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(API_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(API_RETRIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ROWS_EXPORTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ROWS_UPSERTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ROW_FAILURES_TOTAL.clone()));

    tracing::debug!("Metrics registered");
}

pub fn record_api_request(endpoint: &str, status: u16) {
    let status = status.to_string();
    API_REQUESTS_TOTAL
        .with_label_values(&[endpoint, status.as_str()])
        .inc();
}

pub fn record_api_retry(endpoint: &str) {
    API_RETRIES_TOTAL.with_label_values(&[endpoint]).inc();
}

pub fn record_rows_exported(table: &str, rows: usize) {
    ROWS_EXPORTED_TOTAL
        .with_label_values(&[table])
        .inc_by(rows as f64);
}

pub fn record_upsert(table: &str, written: usize, failed: usize) {
    ROWS_UPSERTED_TOTAL
        .with_label_values(&[table])
        .inc_by(written as f64);
    ROW_FAILURES_TOTAL
        .with_label_values(&[table])
        .inc_by(failed as f64);
}

/// Render all registered metrics in the Prometheus text format.
pub fn render() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Write the text exposition to `path`, for the node exporter textfile collector.
pub fn write_textfile(path: &Path) -> anyhow::Result<()> {
    let content = render()?;
    // write-then-rename so the collector never reads a partial file
    let tmp = path.with_extension("prom.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
