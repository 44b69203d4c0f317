//! HTTP surface for the campaign finance API.

pub mod config;
pub mod error;
pub mod routes;

pub use config::Mode;
pub use error::ApiError;
pub use routes::{app, AppState};
