//! Metrics setup and initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

use super::{backend::register_backend_metrics, http::register_http_metrics};
use super::webdav::register_webdav_metrics;

/// Buckets para histogramas (en segundos). Los pushes y clones grandes
/// pueden tardar minutos.
const DURATION_BUCKETS: &[f64] = &[
    0.001, // 1 milisegundo
    0.005, // 5 milisegundos
    0.01,  // 10 milisegundos
    0.05,  // 50 milisegundos
    0.1,   // 100 milisegundos
    0.25,  // 250 milisegundos
    0.5,   // 500 milisegundos
    1.0,   // 1 segundo
    2.5,   // 2.5 segundos
    5.0,   // 5 segundos
    10.0,  // 10 segundos
    30.0,  // 30 segundos
    60.0,  // 1 minuto
    300.0, // 5 minutos
];

/// Inicializa el sistema de metricas y retorna el handle para el endpoint.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)?
        .install_recorder()?;

    register_metrics();
    info!("Metrics system initialized");
    Ok(handle)
}

/// Describe todas las metricas del servidor.
pub fn register_metrics() {
    register_http_metrics();
    register_backend_metrics();
    register_webdav_metrics();
}
