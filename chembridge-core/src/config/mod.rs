//! Bridge configuration
//!
//! Types, defaults and range checks live in [`types`]; [`parse`] reads the
//! embedded `bridge.toml`.

pub mod parse;
pub mod types;

pub use parse::parse_config;
pub use types::*;
