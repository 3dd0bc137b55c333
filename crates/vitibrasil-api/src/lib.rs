//! Vitibrasil API: authenticated HTTP access to Embrapa viticulture tables.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;

pub use auth::{Authorizer, Identity, JwtAuthorizer};
pub use error::ApiError;
pub use server::{router, serve, AppState};
