use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use davgit_core::{DavGitError, PathError};
use davgit_git::BackendError;

use crate::auth::AuthError;
use crate::webdav::WebDavError;

#[derive(Debug)]
pub enum AppError {
    /// Recurso no encontrado
    NotFound,

    /// Error del dominio (rutas, backend, filesystem)
    Core(DavGitError),

    /// Autenticacion o autorizacion fallida
    Auth(AuthError),

    /// Error de una operacion WebDAV
    WebDav(WebDavError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Core(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            },
            AppError::Auth(AuthError::Required { .. }) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::Denied { .. }) => StatusCode::FORBIDDEN,
            AppError::WebDav(e) => e.status(),
        }
    }
}

impl From<DavGitError> for AppError {
    fn from(e: DavGitError) -> Self {
        AppError::Core(e)
    }
}

impl From<PathError> for AppError {
    fn from(e: PathError) -> Self {
        AppError::Core(e.into())
    }
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        AppError::Core(e.into())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl From<WebDavError> for AppError {
    fn from(e: WebDavError) -> Self {
        AppError::WebDav(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = match self {
            AppError::WebDav(e) => return e.into_response(),
            other => other,
        };

        let status = error.status();
        let message = match &error {
            AppError::NotFound => "Not found".to_string(),
            AppError::Core(DavGitError::RepositoryNotFound(_)) => {
                "Repository not found".to_string()
            },
            AppError::Core(e) => e.to_string(),
            AppError::Auth(e) => e.to_string(),
            AppError::WebDav(e) => e.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "Request rejected");
        }

        let mut response = (status, message).into_response();
        if let AppError::Auth(AuthError::Required { realm }) = &error {
            if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{realm}\"")) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(PathError::OutsideRoot("/etc".into())).status(),
            StatusCode::NOT_ACCEPTABLE
        );
        assert_eq!(
            AppError::from(BackendError::NotAvailable).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(BackendError::protocol("bad header")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(AuthError::Denied {
                user: "alice".into(),
                access: "admin"
            })
            .status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_auth_required_sets_challenge() {
        let response = AppError::from(AuthError::Required {
            realm: "davgit".into(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"davgit\""
        );
    }
}
