//! Application state.

use std::sync::Arc;

use davgit_core::LinkConverter;
use davgit_git::HttpBackend;

use crate::auth::AuthPolicy;
use crate::config::ServerConfig;
use crate::webdav::WebDavEngine;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Maps request links onto the repository tree.
    converter: Arc<dyn LinkConverter>,
    auth: Arc<dyn AuthPolicy>,
    backend: HttpBackend,
    webdav: WebDavEngine,
}

impl AppState {
    /// Creates a new AppState from its collaborators.
    pub fn new(
        converter: Arc<dyn LinkConverter>,
        auth: Arc<dyn AuthPolicy>,
        backend: HttpBackend,
    ) -> Self {
        let webdav = WebDavEngine::new(Arc::clone(&converter));
        Self {
            converter,
            auth,
            backend,
            webdav,
        }
    }

    /// Creates an AppState from the server configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, &'static str> {
        Ok(Self::new(
            Arc::new(config.link_converter()),
            Arc::new(config.auth_policy()),
            HttpBackend::new(config.backend_config()?),
        ))
    }

    pub fn converter(&self) -> &dyn LinkConverter {
        self.converter.as_ref()
    }

    pub fn auth(&self) -> &dyn AuthPolicy {
        self.auth.as_ref()
    }

    pub fn backend(&self) -> &HttpBackend {
        &self.backend
    }

    pub fn webdav(&self) -> &WebDavEngine {
        &self.webdav
    }
}
