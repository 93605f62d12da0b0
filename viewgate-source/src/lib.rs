//! # viewgate Source
//!
//! Data sources that satisfy [`ViewSource`](viewgate_core::ViewSource).
//!
//! - **libSQL**: a remote Turso/libSQL database, or a local file with the
//!   `local` feature
//! - **Memory**: fixed in-process rows for development and testing
//!
//! ## Example
//!
//! ```rust,ignore
//! use viewgate_source::{LibsqlSource, SourceConfig};
//!
//! let source = LibsqlSource::connect(SourceConfig::new(url, "VORP_Latest")).await?;
//! let rows = source.fetch(100).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod database;
mod memory;

pub use database::{LibsqlSource, SourceConfig};
pub use memory::MemorySource;
