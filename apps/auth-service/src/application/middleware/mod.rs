pub mod auth;

pub use auth::{authenticate, parse_refresh_token, validate_refresh_token};
