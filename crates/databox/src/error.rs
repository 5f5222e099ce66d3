//! Error types for databox.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`DataBoxError`].
pub type DataBoxResult<T> = Result<T, DataBoxError>;

/// Errors surfaced by box operations.
///
/// There is no local recovery: every error aborts the current operation and
/// propagates to the command surface. Engine API errors pass through
/// unchanged, except a 404 on inspect which becomes [`DataBoxError::BoxNotFound`].
#[derive(Error, Diagnostic, Debug)]
pub enum DataBoxError {
    /// The name does not resolve to a valid data-only, non-running container.
    #[error("Box not found: {name}")]
    #[diagnostic(
        code(databox::boxes::not_found),
        help("A box is a stopped container carrying the `data-only` label; see `databox box ls`")
    )]
    BoxNotFound {
        /// The name that failed to resolve.
        name: String,
    },

    /// The container does not declare exactly one volume.
    #[error("Container {id} does not declare a single shared volume")]
    #[diagnostic(code(databox::boxes::no_shared_volume))]
    NoSharedVolume {
        /// The offending container ID.
        id: String,
    },

    /// The box's shared path has no backing entry in the container mount list.
    #[error("Box {name} has no mount backing its shared path {path}")]
    #[diagnostic(
        code(databox::boxes::mount_missing),
        help("The container's volume may have been removed behind the engine's back")
    )]
    SharedMountMissing {
        /// The box name.
        name: String,
        /// The declared shared path.
        path: String,
    },

    /// The engine returned a container record missing a required field.
    #[error("Malformed container record: missing {field}")]
    #[diagnostic(code(databox::boxes::malformed))]
    MalformedContainer {
        /// The absent field.
        field: &'static str,
    },

    /// The engine host URL could not be understood.
    #[error("Invalid engine host: {host}")]
    #[diagnostic(
        code(databox::engine::invalid_host),
        help("Use `unix:///path/to/docker.sock` or `tcp://host:port`")
    )]
    InvalidEngineHost {
        /// The rejected host string.
        host: String,
    },

    /// Engine API error (network, protocol, or non-404 status).
    #[error("Engine API error: {0}")]
    #[diagnostic(code(databox::engine))]
    Engine(#[from] bollard::errors::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(databox::io))]
    Io(#[from] std::io::Error),

    /// Feature that exists on the command surface but is not implemented.
    #[error("{feature} are not implemented yet")]
    #[diagnostic(code(databox::unimplemented))]
    Unimplemented {
        /// The unimplemented feature.
        feature: &'static str,
    },
}
