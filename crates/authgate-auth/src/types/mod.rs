//! Domain types shared across the crate.

mod refresh_token;
mod user;

pub use refresh_token::RefreshToken;
pub use user::User;
