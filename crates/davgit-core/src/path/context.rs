//! Per-request link context.

use std::path::Path;

use super::clean::strip_root;
use super::grammar::repository_path;
use super::resolver::LinkConverter;
use crate::error::PathError;

/// Link and path of the resource a request targets.
///
/// Built once per request from a [`LinkConverter`] and never mutated
/// afterwards. A context is only usable when [`is_valid`](Self::is_valid)
/// holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkContext {
    root_link: String,
    root_path: String,
    current_link: String,
    current_path: String,
}

impl LinkContext {
    /// Builds a context from already resolved parts.
    pub fn new(
        root_link: impl Into<String>,
        root_path: impl Into<String>,
        current_link: impl Into<String>,
        current_path: impl Into<String>,
    ) -> Self {
        Self {
            root_link: root_link.into(),
            root_path: root_path.into(),
            current_link: current_link.into(),
            current_path: current_path.into(),
        }
    }

    /// Resolves `link` through `converter`.
    ///
    /// The current link is re-derived from the resolved path, so it is
    /// always in canonical form.
    pub fn resolve(converter: &dyn LinkConverter, link: &str) -> Result<Self, PathError> {
        let current_path = converter.link_to_path(link)?;
        let current_link = converter.path_to_link(&current_path);

        Ok(Self::new(
            converter.root_link(),
            converter.root_path(),
            current_link,
            current_path,
        ))
    }

    /// Returns true when all four parts are set.
    pub fn is_valid(&self) -> bool {
        !self.root_link.is_empty()
            && !self.root_path.is_empty()
            && !self.current_link.is_empty()
            && !self.current_path.is_empty()
    }

    pub fn root_link(&self) -> &str {
        &self.root_link
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn current_link(&self) -> &str {
        &self.current_link
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Current path as a filesystem path.
    pub fn current_fs_path(&self) -> &Path {
        Path::new(&self.current_path)
    }

    /// Current path relative to the root, with a leading `/`.
    pub fn relative_path(&self) -> &str {
        strip_root(&self.current_path, &self.root_path).unwrap_or(&self.current_path)
    }

    /// The enclosing repository (last `*.git` segment), if any.
    pub fn repository_path(&self) -> Option<&str> {
        repository_path(&self.current_path)
    }

    /// Path inside the repository, used as the backend's `PATH_INFO`.
    ///
    /// Returns `/` when the context points at the repository itself.
    pub fn path_in_repository(&self) -> &str {
        match self.repository_path() {
            Some(repo) => match &self.current_path[repo.len()..] {
                "" => "/",
                rest => rest,
            },
            None => "/",
        }
    }

    /// Returns true if the context is inside a repository; with `strict`,
    /// only if it points at the repository directory itself.
    pub fn is_repository(&self, strict: bool) -> bool {
        match self.repository_path() {
            Some(repo) if strict => repo == self.current_path,
            Some(_) => true,
            None => false,
        }
    }
}
