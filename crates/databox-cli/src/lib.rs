//! # databox-cli
//!
//! Command-line front end for databox: create, list, execute into, copy
//! between, and remove data-only boxes on a container engine.

#![warn(missing_docs)]

pub mod cli;

pub use cli::Cli;
