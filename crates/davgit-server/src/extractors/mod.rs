//! Request extractors.

pub mod credentials;
pub mod depth;

pub use credentials::BasicAuth;
pub use depth::Depth;
