//! Shared foundation for the paper knowledge pipeline: errors, the
//! Railway-Oriented `Result` alias, the shared data model, and process
//! configuration.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod domain;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::Error;
pub use result::{GenericResultExt, OptionExt, Result, ResultExt};
