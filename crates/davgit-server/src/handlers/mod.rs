//! HTTP handlers.

pub mod dispatch;
pub mod git;
pub mod health;
pub mod metrics;
