//! HTTP presentation layer
//!
//! An axum router over `AppState`. Handlers translate between the JSON shapes
//! clients send and the service operations; `ApiError` maps failure
//! categories onto status codes.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{router, ApiServer};
