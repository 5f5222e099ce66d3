//! # databox
//!
//! Data-only container ("box") management over the Docker Engine API.
//!
//! A box is a stopped container used purely as a named, labeled holder for a
//! data volume. This crate provides:
//! - An explicit engine connection handle ([`EngineConfig`])
//! - A typed box model decoded from container inspection ([`DataBox`])
//! - Endpoint and mount-point resolution for copy operations ([`Endpoint`],
//!   [`Location`])
//! - The box repository ([`BoxStore`]): create, find, list, delete, exec, copy

#![warn(missing_docs)]

pub mod boxes;
pub mod engine;
pub mod error;
pub mod location;
pub mod store;

pub use boxes::DataBox;
pub use engine::EngineConfig;
pub use error::{DataBoxError, DataBoxResult};
pub use location::{Endpoint, Location};
pub use store::{BoxStore, OutputStream};
