//! Git backend metrics.

use metrics::counter;

/// Resultado de lanzar el backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Started,
    Unavailable,
    Failed,
}

impl SpawnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Unavailable => "unavailable",
            Self::Failed => "failed",
        }
    }
}

/// Registra las metricas del backend.
pub fn register_backend_metrics() {
    metrics::describe_counter!(
        "davgit_backend_spawns_total",
        "Total number of git-http-backend executions by outcome"
    );
    metrics::describe_counter!(
        "davgit_backend_fallbacks_total",
        "Requests served as static files because the backend was unavailable"
    );
}

/// Registra un intento de ejecutar el backend.
pub fn record_spawn(outcome: SpawnOutcome) {
    counter!("davgit_backend_spawns_total", "outcome" => outcome.as_str()).increment(1);
}

/// Registra una respuesta servida como archivo estatico.
pub fn record_fallback() {
    counter!("davgit_backend_fallbacks_total").increment(1);
}
