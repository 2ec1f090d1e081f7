//! Test helpers para davgit-server.

#![allow(dead_code, unused_imports)]

pub mod assertions;
pub mod client;
pub mod fixture;

pub use assertions::*;
pub use client::{TestClient, TestResponse, client};
pub use fixture::{Fixture, PASSWORD, ROOT_LINK, USER};
