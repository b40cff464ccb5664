use std::time::Duration;

use crate::dialect::Dialect;

#[cfg(feature = "metrics")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "metrics")]
pub(crate) fn record_query_metrics(operation: &str, dialect: Dialect, elapsed: Duration) {
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let labels = [
        ("operation", operation.to_owned()),
        ("dialect", dialect.label().to_owned()),
    ];
    metrics::histogram!("strata.query.duration_ms", &labels).record(elapsed_ms);
    metrics::counter!("strata.query.count", &labels).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_query_metrics(_operation: &str, _dialect: Dialect, _elapsed: Duration) {}

/// Install the Prometheus recorder and return the handle for scraping.
#[cfg(feature = "metrics")]
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

/// Publish pool size gauges for a bundled sqlx pool.
#[cfg(all(
    feature = "metrics",
    any(feature = "sqlite", feature = "postgres", feature = "mysql")
))]
pub fn record_pool_stats<DB: sqlx::Database>(pool: &sqlx::Pool<DB>, dialect: Dialect) {
    let db = dialect.label();
    metrics::gauge!("strata.pool.size", "db" => db).set(f64::from(pool.size()));
    metrics::gauge!("strata.pool.idle", "db" => db).set(pool.num_idle() as f64);
    metrics::gauge!("strata.pool.max_size", "db" => db)
        .set(f64::from(pool.options().get_max_connections()));
}
