//! Test utilities shared across crate-level unit tests.

pub mod fixtures;
pub mod http;

pub use fixtures::{post_row, World};
pub use http::start_mock_server;
