//! Web API module for filegate.
//!
//! This module provides the REST API for uploading, listing, reading and
//! deleting files.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::{JwtClaims, JwtState};
pub use router::create_router;
pub use server::WebServer;
