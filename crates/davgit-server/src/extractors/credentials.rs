use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::Credentials;

/// Extractor que lee credenciales `Authorization: Basic`, si las hay.
pub struct BasicAuth(pub Option<Credentials>);

impl<S> FromRequestParts<S> for BasicAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Credentials::from_headers(&parts.headers)))
    }
}
