//! Metric names and the Prometheus recorder.
//!
//! Recording goes through the `metrics` macros at the call sites; this module
//! only owns the names so they are spelled once.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

pub const PIPELINE_RUNS_TOTAL: &str = "contact_map_pipeline_runs_total";
pub const PIPELINE_RUN_DURATION_SECONDS: &str = "contact_map_pipeline_run_duration_seconds";
pub const PIPELINE_CONTACTS_ENRICHED_TOTAL: &str = "contact_map_contacts_enriched_total";
pub const FETCH_ERRORS_TOTAL: &str = "contact_map_fetch_errors_total";
pub const GEOCODE_REQUESTS_TOTAL: &str = "contact_map_geocode_requests_total";
pub const GEOCODE_DURATION_SECONDS: &str = "contact_map_geocode_duration_seconds";
pub const PROXY_REQUESTS_TOTAL: &str = "contact_map_proxy_requests_total";

/// Install the global Prometheus recorder.
///
/// Returns `None` when a recorder is already installed (e.g. a second call in
/// the same process); metrics keep flowing to the first one.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            warn!("Prometheus recorder install failed (possibly already installed): {}", e);
            None
        }
    }
}
