//! WebDAV operation metrics.

use axum::http::StatusCode;
use metrics::counter;

use crate::webdav::WebDavMethod;

/// Registra las metricas WebDAV.
pub fn register_webdav_metrics() {
    metrics::describe_counter!(
        "davgit_webdav_operations_total",
        "Total number of WebDAV operations by method and status"
    );
}

/// Registra una operacion WebDAV terminada.
pub fn record_operation(method: WebDavMethod, status: StatusCode) {
    counter!(
        "davgit_webdav_operations_total",
        "method" => method.as_str(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}
