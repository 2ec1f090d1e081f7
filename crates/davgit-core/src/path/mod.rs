//! Path resolution for repository links.
//!
//! - [`clean_path`]: lexical normalization of `.`, `..` and empty segments
//! - [`LinkConverter`] / [`PathResolver`]: link to path mapping with root
//!   containment checks
//! - [`LinkContext`]: the resolved target of one request
//! - [`is_git_protocol_path`] / [`repository_path`]: Git HTTP URL grammar

mod clean;
mod context;
mod grammar;
mod resolver;

pub use clean::{clean_path, is_within, strip_root};
pub use context::LinkContext;
pub use grammar::{GitService, is_git_protocol_path, is_smart_only_path, repository_path};
pub use resolver::{LinkConverter, PathResolver};
