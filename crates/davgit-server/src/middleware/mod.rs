//! Tower layers wrapped around every route.
//!
//! `RequestIdLayer` runs first so that the id is already on the request
//! when `LoggingLayer` opens its span. The id also reaches
//! `git-http-backend` as `HTTP_X_REQUEST_ID`.

mod logging;
mod request_id;

pub use logging::{LoggingLayer, LoggingMiddleware};
pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer, RequestIdMiddleware};
