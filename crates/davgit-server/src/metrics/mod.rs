//! Metrics module for the DavGit server.

pub mod backend;
pub mod http;
pub mod setup;
pub mod webdav;

pub use setup::{init_metrics, register_metrics};
