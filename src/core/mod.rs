//! The core module holds the error type and the configuration every other module depends on.

pub mod error;
pub mod settings;
