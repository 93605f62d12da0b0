//! # viewgate Core
//!
//! Core types, errors, and traits shared by the viewgate crates.
//!
//! - **Types**: the opaque [`Row`] returned by a view, identifier validation
//! - **Errors**: [`ViewgateError`] and the crate-wide [`Result`] alias
//! - **Constants**: defaults for TTL, limits, headers, and origins
//! - **Traits**: [`ViewSource`], the seam between the cache and the database
//!
//! ## Example
//!
//! ```rust
//! use viewgate_core::{row_from_pairs, validate_identifier};
//!
//! assert!(validate_identifier("VORP_Latest").is_ok());
//! let row = row_from_pairs([("player", "A. Smith".into())]);
//! assert_eq!(row["player"], "A. Smith");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, ViewgateError};
pub use traits::*;
pub use types::*;
