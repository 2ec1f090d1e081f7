//! Request dispatch between the Git backend, static files and WebDAV.

use std::path::Path;

use axum::{
    extract::{Request, State},
    http::Method,
    response::Response,
};
use davgit_core::path::{GitService, is_git_protocol_path, is_smart_only_path};
use davgit_core::{DavGitError, LinkContext};
use tracing::{debug, instrument};

use crate::auth::Access;
use crate::error::AppError;
use crate::extractors::{BasicAuth, Depth};
use crate::handlers::git::{exec_backend, serve_static};
use crate::metrics::backend::record_fallback;
use crate::state::AppState;

/// Where a request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `git-http-backend`; with `fallback`, static serving when it is missing.
    Backend { fallback: bool },
    /// A plain file from the repository.
    Static,
    WebDav,
}

/// Decides the access level and handler for a request.
pub fn classify(method: &Method, path: &str, query: Option<&str>) -> (Access, Route) {
    match *method {
        Method::GET | Method::HEAD => match GitService::from_query(query) {
            Some(GitService::UploadPack) => (Access::Pull, Route::Backend { fallback: false }),
            Some(GitService::ReceivePack) => (Access::Push, Route::Backend { fallback: false }),
            None if is_git_protocol_path(path) => (
                Access::Pull,
                Route::Backend {
                    fallback: !is_smart_only_path(path),
                },
            ),
            None => (Access::Pull, Route::Static),
        },
        // git-http-backend enforces receive-pack access through REMOTE_USER.
        Method::POST => (Access::Pull, Route::Backend { fallback: false }),
        _ => (Access::Push, Route::WebDav),
    }
}

/// Fallback handler for every request below the repository root.
#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn dispatch(
    State(state): State<AppState>,
    BasicAuth(credentials): BasicAuth,
    depth: Depth,
    request: Request,
) -> Result<Response, AppError> {
    let ctx = LinkContext::resolve(state.converter(), request.uri().path())?;
    if !ctx.is_valid() {
        return Err(DavGitError::path_validation(request.uri().path(), "incomplete link").into());
    }

    let repository = ctx
        .repository_path()
        .ok_or_else(|| DavGitError::path_validation(ctx.current_path(), "no repository"))?;

    let (access, route) = classify(request.method(), ctx.current_path(), request.uri().query());
    // WebDAV may create the repository itself (MKCOL, PUT).
    if route != Route::WebDav && !Path::new(repository).is_dir() {
        return Err(DavGitError::repository_not_found(repository).into());
    }
    let user = state
        .auth()
        .authorize(access, credentials.as_ref())
        .await?;
    debug!(?route, access = access.as_str(), user = ?user, "Dispatching");

    let is_head = request.method() == Method::HEAD;
    match route {
        Route::WebDav => {
            let (parts, body) = request.into_parts();
            Ok(state
                .webdav()
                .handle(&parts.method, &ctx, &parts.headers, depth, body)
                .await?)
        },
        Route::Static => serve_static(&ctx, is_head).await,
        Route::Backend { fallback } => match exec_backend(&state, &ctx, user, request).await {
            Ok(response) => Ok(response),
            Err(e) if fallback && e.is_unavailable() => {
                debug!(error = %e, "Backend unavailable, serving static file");
                record_fallback();
                serve_static(&ctx, is_head).await
            },
            Err(e) => Err(e.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_classify_smart_service_queries() {
        assert_eq!(
            classify(&Method::GET, "/srv/demo.git/info/refs", Some("service=git-upload-pack")),
            (Access::Pull, Route::Backend { fallback: false })
        );
        assert_eq!(
            classify(&Method::GET, "/srv/demo.git/info/refs", Some("service=git-receive-pack")),
            (Access::Push, Route::Backend { fallback: false })
        );
    }

    #[test]
    fn test_classify_dumb_protocol_paths() {
        for path in [
            "/srv/demo.git/HEAD".to_string(),
            "/srv/demo.git/info/refs".to_string(),
            "/srv/demo.git/objects/info/packs".to_string(),
            format!("/srv/demo.git/objects/{}/{}", &HASH[..2], &HASH[2..]),
            format!("/srv/demo.git/objects/pack/pack-{HASH}.idx"),
        ] {
            assert_eq!(
                classify(&Method::GET, &path, None),
                (Access::Pull, Route::Backend { fallback: true }),
                "{path}"
            );
        }
    }

    #[test]
    fn test_classify_smart_only_paths_never_fall_back() {
        assert_eq!(
            classify(&Method::GET, "/srv/demo.git/git-upload-pack", None),
            (Access::Pull, Route::Backend { fallback: false })
        );
        assert_eq!(
            classify(&Method::POST, "/srv/demo.git/git-receive-pack", None),
            (Access::Pull, Route::Backend { fallback: false })
        );
    }

    #[test]
    fn test_classify_plain_files_are_static() {
        assert_eq!(
            classify(&Method::HEAD, "/srv/demo.git/refs/heads/master", None),
            (Access::Pull, Route::Static)
        );
        assert_eq!(
            classify(&Method::GET, "/srv/demo.git/README.md", Some("service=other")),
            (Access::Pull, Route::Static)
        );
    }

    #[test]
    fn test_classify_other_methods_are_webdav() {
        for method in ["PROPFIND", "PUT", "MKCOL", "LOCK", "DELETE"] {
            let method = Method::from_bytes(method.as_bytes()).unwrap();
            assert_eq!(
                classify(&method, "/srv/demo.git/a.txt", None),
                (Access::Push, Route::WebDav)
            );
        }
    }
}
