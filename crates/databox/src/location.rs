//! Endpoint classification and mount-point resolution for copy operations.
//!
//! An endpoint string either names a local path (`bar/baz`) or a path inside
//! a box (`foo:bar/baz`); the split is on the first `:`. A resolved
//! [`Location`] pairs a host mount point with an in-container path.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::boxes::DataBox;
use crate::error::DataBoxResult;
use crate::store::BoxStore;

/// Bind target for the copy source inside a helper container.
pub const SRC_MOUNT: &str = "/mnt/src";

/// Bind target for the copy destination inside a helper container.
pub const DST_MOUNT: &str = "/mnt/dst";

/// A parsed but unresolved endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    /// A path on the local filesystem.
    Local {
        /// The path, relative to the current working directory.
        path: String,
    },
    /// A path inside a named box.
    Box {
        /// The box name (the prefix before the first `:`).
        name: String,
        /// The path inside the box.
        path: String,
    },
}

impl Endpoint {
    /// Classify an endpoint string by splitting on the first `:`.
    #[must_use]
    pub fn parse(endpoint: &str) -> Self {
        match endpoint.split_once(':') {
            Some((name, path)) => Self::Box {
                name: name.to_string(),
                path: path.to_string(),
            },
            None => Self::Local {
                path: endpoint.to_string(),
            },
        }
    }
}

/// A resolved endpoint: a host mount point paired with an in-container path.
#[derive(Debug, Clone)]
pub enum Location {
    /// Anchored at the current working directory.
    Local {
        /// Path relative to the mount point.
        path: String,
    },
    /// Anchored at the host path backing a box's shared-path mount.
    Box {
        /// The resolved box.
        bx: DataBox,
        /// Path relative to the box's shared path.
        path: String,
    },
}

impl Location {
    /// Resolve an endpoint string, looking up the box for `name:path` forms.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::DataBoxError::BoxNotFound`] when the prefix does
    /// not name a valid box.
    pub async fn resolve(store: &BoxStore, endpoint: &str) -> DataBoxResult<Self> {
        match Endpoint::parse(endpoint) {
            Endpoint::Local { path } => Ok(Self::Local { path }),
            Endpoint::Box { name, path } => Ok(Self::Box {
                bx: store.find(&name).await?,
                path,
            }),
        }
    }

    /// Host filesystem path to bind into the helper container.
    ///
    /// # Errors
    ///
    /// Fails when the current working directory is unavailable or the box's
    /// shared-path mount is absent from the container mount list.
    pub fn mountpoint(&self) -> DataBoxResult<PathBuf> {
        match self {
            Self::Local { .. } => Ok(std::env::current_dir()?),
            Self::Box { bx, .. } => bx.mountpoint(),
        }
    }

    /// The in-container path component of the endpoint.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Local { path } | Self::Box { path, .. } => path,
        }
    }
}

/// Join an endpoint path under a bind root.
///
/// The path is treated as relative to the bind root: leading `/` and `./`
/// segments are stripped, so an absolute box-side path like `/data/file.txt`
/// lands at `<base>/data/file.txt`.
pub(crate) fn mount_path(base: &str, path: &str) -> String {
    let relative = path.trim_start_matches("./").trim_start_matches('/');
    if relative.is_empty() || relative == "." {
        base.to_string()
    } else {
        format!("{base}/{relative}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_endpoint_splits_on_first_colon() {
        assert_eq!(
            Endpoint::parse("foo:bar/baz"),
            Endpoint::Box {
                name: "foo".to_string(),
                path: "bar/baz".to_string(),
            }
        );
    }

    #[test]
    fn box_endpoint_keeps_later_colons_in_path() {
        assert_eq!(
            Endpoint::parse("foo:bar:baz"),
            Endpoint::Box {
                name: "foo".to_string(),
                path: "bar:baz".to_string(),
            }
        );
    }

    #[test]
    fn plain_path_is_local() {
        assert_eq!(
            Endpoint::parse("bar/baz"),
            Endpoint::Local {
                path: "bar/baz".to_string(),
            }
        );
    }

    #[test]
    fn empty_box_path_is_allowed() {
        assert_eq!(
            Endpoint::parse("data1:"),
            Endpoint::Box {
                name: "data1".to_string(),
                path: String::new(),
            }
        );
    }

    #[test]
    fn local_mountpoint_is_current_dir() {
        let location = Location::Local {
            path: "out".to_string(),
        };
        assert_eq!(
            location.mountpoint().unwrap(),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn mount_path_strips_absolute_prefix() {
        assert_eq!(mount_path(SRC_MOUNT, "/data/file.txt"), "/mnt/src/data/file.txt");
    }

    #[test]
    fn mount_path_strips_dot_slash() {
        assert_eq!(mount_path(DST_MOUNT, "./out"), "/mnt/dst/out");
    }

    #[test]
    fn mount_path_of_empty_is_bind_root() {
        assert_eq!(mount_path(DST_MOUNT, ""), "/mnt/dst");
        assert_eq!(mount_path(DST_MOUNT, "."), "/mnt/dst");
    }
}
