//! Argon2id password hashing.

mod config;
mod errors;
mod hasher;

pub use config::HashConfig;
pub use errors::HashError;
pub use hasher::PasswordHasher;
