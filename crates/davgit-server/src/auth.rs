//! Access control for Git and WebDAV requests.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Level of access a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Clone and fetch.
    Pull,
    /// Push and file modifications.
    Push,
    /// Administrative operations.
    Admin,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Admin => "admin",
        }
    }
}

/// Credentials presented with `Authorization: Basic`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parses the `Authorization` header; anything but valid Basic
    /// credentials yields `None`.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }
}

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No or invalid credentials; the client should retry with some.
    #[error("authentication required for realm '{realm}'")]
    Required { realm: String },

    /// Valid credentials without the needed access.
    #[error("user '{user}' is not allowed to {access}")]
    Denied { user: String, access: &'static str },
}

/// Decides whether a request may proceed.
#[async_trait]
pub trait AuthPolicy: Send + Sync {
    /// Returns the authenticated user name, if any, when access is granted.
    async fn authorize(
        &self,
        access: Access,
        credentials: Option<&Credentials>,
    ) -> Result<Option<String>, AuthError>;

    /// Realm announced in `WWW-Authenticate`.
    fn realm(&self) -> &str;
}

/// A configured account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    username: String,
    password_sha256: String,
    admin: bool,
}

impl User {
    pub fn new(username: impl Into<String>, password_sha256: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_sha256: password_sha256.into().to_ascii_lowercase(),
            admin: false,
        }
    }

    /// Creates a user from a clear-text password.
    pub fn with_password(username: impl Into<String>, password: &str) -> Self {
        Self::new(username, hash_password(password))
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

/// Lowercase hex SHA-256 digest of `password`.
pub fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Policy backed by a fixed list of users.
///
/// Pulling is open to everyone, pushing needs a known user and admin
/// access needs a user with the admin flag.
#[derive(Debug, Clone, Default)]
pub struct UserListAuth {
    realm: String,
    users: HashMap<String, User>,
}

impl UserListAuth {
    pub fn new(realm: impl Into<String>, users: impl IntoIterator<Item = User>) -> Self {
        Self {
            realm: realm.into(),
            users: users
                .into_iter()
                .map(|user| (user.username.clone(), user))
                .collect(),
        }
    }

    fn verify(&self, credentials: &Credentials) -> Option<&User> {
        let user = self.users.get(&credentials.username)?;
        (user.password_sha256 == hash_password(&credentials.password)).then_some(user)
    }

    fn required(&self) -> AuthError {
        AuthError::Required {
            realm: self.realm.clone(),
        }
    }
}

#[async_trait]
impl AuthPolicy for UserListAuth {
    async fn authorize(
        &self,
        access: Access,
        credentials: Option<&Credentials>,
    ) -> Result<Option<String>, AuthError> {
        let user = credentials.and_then(|credentials| self.verify(credentials));

        match (access, user) {
            (Access::Pull, user) => Ok(user.map(|u| u.username.clone())),
            (_, None) => {
                debug!(access = access.as_str(), "Missing or invalid credentials");
                Err(self.required())
            },
            (Access::Push, Some(user)) => Ok(Some(user.username.clone())),
            (Access::Admin, Some(user)) if user.admin => Ok(Some(user.username.clone())),
            (Access::Admin, Some(user)) => Err(AuthError::Denied {
                user: user.username.clone(),
                access: access.as_str(),
            }),
        }
    }

    fn realm(&self) -> &str {
        &self.realm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy() -> UserListAuth {
        UserListAuth::new(
            "davgit",
            [
                User::with_password("alice", "secret"),
                User::with_password("root", "toor").with_admin(true),
            ],
        )
    }

    fn basic(user: &str, password: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode(format!("{user}:{password}"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_hash_password() {
        assert_eq!(
            hash_password("admin"),
            "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918"
        );
    }

    #[test]
    fn test_credentials_from_headers() {
        let credentials = Credentials::from_headers(&basic("alice", "pa:ss")).unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "pa:ss");

        let mut bearer = HeaderMap::new();
        bearer.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(Credentials::from_headers(&bearer).is_none());
        assert!(Credentials::from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let credentials = Credentials::new("alice", "secret");
        assert!(!format!("{credentials:?}").contains("secret"));
    }

    #[tokio::test]
    async fn test_pull_is_open() {
        let policy = policy();
        assert_eq!(policy.authorize(Access::Pull, None).await, Ok(None));

        let wrong = Credentials::new("alice", "nope");
        assert_eq!(policy.authorize(Access::Pull, Some(&wrong)).await, Ok(None));
    }

    #[tokio::test]
    async fn test_pull_reports_valid_user() {
        let alice = Credentials::new("alice", "secret");
        assert_eq!(
            policy().authorize(Access::Pull, Some(&alice)).await,
            Ok(Some("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_push_requires_valid_user() {
        let policy = policy();

        assert!(matches!(
            policy.authorize(Access::Push, None).await,
            Err(AuthError::Required { realm }) if realm == "davgit"
        ));

        let wrong = Credentials::new("alice", "nope");
        assert!(matches!(
            policy.authorize(Access::Push, Some(&wrong)).await,
            Err(AuthError::Required { .. })
        ));

        let alice = Credentials::new("alice", "secret");
        assert_eq!(
            policy.authorize(Access::Push, Some(&alice)).await,
            Ok(Some("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_admin_requires_flag() {
        let policy = policy();

        let alice = Credentials::new("alice", "secret");
        assert!(matches!(
            policy.authorize(Access::Admin, Some(&alice)).await,
            Err(AuthError::Denied { .. })
        ));

        let root = Credentials::new("root", "toor");
        assert_eq!(
            policy.authorize(Access::Admin, Some(&root)).await,
            Ok(Some("root".to_string()))
        );
    }
}
