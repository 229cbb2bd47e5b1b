//! Shared types for clearinghouse

pub mod error;

pub use error::{CoreError, Result};
