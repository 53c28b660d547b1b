pub mod browser;
pub mod fixtures;

pub use browser::{MockBrowser, TestResponse};
pub use fixtures::*;
