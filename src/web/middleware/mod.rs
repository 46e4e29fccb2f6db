//! Middleware for Web API.

pub mod auth;
pub mod cors;

pub use auth::{jwt_auth, AdminUser, AuthUser, JwtClaims, JwtState, VerifiedUser};
pub use cors::create_cors_layer;
