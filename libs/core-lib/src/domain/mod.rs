pub mod refresh_token;
pub mod tenant;
pub mod user;
