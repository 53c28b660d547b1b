mod memory;
mod sqlite;
mod types;

pub use types::{InMemoryUserStore, SqliteUserStore, UserStore};
