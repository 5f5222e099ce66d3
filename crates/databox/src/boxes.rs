//! Typed box model decoded from engine container records.
//!
//! A box is a container carrying the [`DATA_ONLY_LABEL`] and currently not
//! running. The engine's inspect response is loosely shaped (every field
//! optional); decoding into [`DataBox`] fails fast when a required field is
//! absent instead of assuming ambient shape.

use std::collections::HashMap;
use std::path::PathBuf;

use bollard::models::ContainerInspectResponse;
use serde::{Deserialize, Serialize};

use crate::error::{DataBoxError, DataBoxResult};

/// Sentinel label distinguishing a box from ordinary workload containers.
pub const DATA_ONLY_LABEL: &str = "data-only";

/// A volume mount on a box: host source path backing a container destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxMount {
    /// Host filesystem path backing the mount.
    pub source: String,
    /// Path of the mount inside the container.
    pub destination: String,
}

/// A data-only container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataBox {
    id: String,
    name: String,
    shared_path: String,
    running: bool,
    labels: HashMap<String, String>,
    mounts: Vec<BoxMount>,
}

impl DataBox {
    /// The box-identification predicate: labeled `data-only` and not running.
    ///
    /// Evaluated on the raw inspect record so that ordinary containers are
    /// rejected before any shape requirements apply.
    #[must_use]
    pub fn is_box(container: &ContainerInspectResponse) -> bool {
        let labeled = container
            .config
            .as_ref()
            .and_then(|config| config.labels.as_ref())
            .is_some_and(|labels| labels.contains_key(DATA_ONLY_LABEL));
        let running = container
            .state
            .as_ref()
            .and_then(|state| state.running)
            .unwrap_or(false);
        labeled && !running
    }

    /// Decode an inspect response into a typed box.
    ///
    /// # Errors
    ///
    /// Returns [`DataBoxError::MalformedContainer`] when the ID, name, or
    /// running state is absent, and [`DataBoxError::NoSharedVolume`] unless
    /// the record declares exactly one volume.
    pub fn from_inspect(container: ContainerInspectResponse) -> DataBoxResult<Self> {
        let id = container
            .id
            .ok_or(DataBoxError::MalformedContainer { field: "Id" })?;
        let name = container
            .name
            .ok_or(DataBoxError::MalformedContainer { field: "Name" })?;
        let running = container
            .state
            .and_then(|state| state.running)
            .ok_or(DataBoxError::MalformedContainer {
                field: "State.Running",
            })?;

        let config = container
            .config
            .ok_or(DataBoxError::MalformedContainer { field: "Config" })?;
        let labels = config.labels.unwrap_or_default();

        let volumes = config.volumes.unwrap_or_default();
        if volumes.len() != 1 {
            return Err(DataBoxError::NoSharedVolume { id });
        }
        let shared_path = volumes
            .into_keys()
            .next()
            .ok_or(DataBoxError::MalformedContainer {
                field: "Config.Volumes",
            })?;

        let mounts = container
            .mounts
            .unwrap_or_default()
            .into_iter()
            .filter_map(|mount| {
                Some(BoxMount {
                    source: mount.source?,
                    destination: mount.destination?,
                })
            })
            .collect();

        Ok(Self {
            id,
            // Engine container names carry a leading `/`.
            name: name.trim_start_matches('/').to_string(),
            shared_path,
            running,
            labels,
            mounts,
        })
    }

    /// Opaque container ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name (container name minus the leading separator).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The single volume mount path declared when the box was created.
    #[must_use]
    pub fn shared_path(&self) -> &str {
        &self.shared_path
    }

    /// Whether the underlying container is currently running.
    #[must_use]
    pub fn running(&self) -> bool {
        self.running
    }

    /// Host filesystem path backing the box's shared path.
    ///
    /// # Errors
    ///
    /// Returns [`DataBoxError::SharedMountMissing`] when no entry in the
    /// container mount list has the shared path as its destination.
    pub fn mountpoint(&self) -> DataBoxResult<PathBuf> {
        self.mounts
            .iter()
            .find(|mount| mount.destination == self.shared_path)
            .map(|mount| PathBuf::from(&mount.source))
            .ok_or_else(|| DataBoxError::SharedMountMissing {
                name: self.name.clone(),
                path: self.shared_path.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, ContainerState, MountPoint};

    fn inspect_response(labeled: bool, running: bool) -> ContainerInspectResponse {
        let labels = if labeled {
            HashMap::from([(DATA_ONLY_LABEL.to_string(), String::new())])
        } else {
            HashMap::new()
        };
        ContainerInspectResponse {
            id: Some("abc123".to_string()),
            name: Some("/data1".to_string()),
            state: Some(ContainerState {
                running: Some(running),
                ..Default::default()
            }),
            config: Some(ContainerConfig {
                labels: Some(labels),
                volumes: Some(HashMap::from([("/data".to_string(), HashMap::new())])),
                ..Default::default()
            }),
            mounts: Some(vec![MountPoint {
                source: Some("/var/lib/docker/volumes/xyz/_data".to_string()),
                destination: Some("/data".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn predicate_accepts_labeled_stopped_container() {
        assert!(DataBox::is_box(&inspect_response(true, false)));
    }

    #[test]
    fn predicate_rejects_running_container() {
        assert!(!DataBox::is_box(&inspect_response(true, true)));
    }

    #[test]
    fn predicate_rejects_unlabeled_container() {
        assert!(!DataBox::is_box(&inspect_response(false, false)));
    }

    #[test]
    fn predicate_rejects_bare_record() {
        assert!(!DataBox::is_box(&ContainerInspectResponse::default()));
    }

    #[test]
    fn decode_trims_name_separator() {
        let bx = DataBox::from_inspect(inspect_response(true, false)).unwrap();
        assert_eq!(bx.name(), "data1");
        assert_eq!(bx.id(), "abc123");
        assert_eq!(bx.shared_path(), "/data");
        assert!(!bx.running());
    }

    #[test]
    fn decode_requires_id() {
        let mut inspect = inspect_response(true, false);
        inspect.id = None;
        assert!(matches!(
            DataBox::from_inspect(inspect),
            Err(DataBoxError::MalformedContainer { field: "Id" })
        ));
    }

    #[test]
    fn decode_requires_running_state() {
        let mut inspect = inspect_response(true, false);
        inspect.state = None;
        assert!(matches!(
            DataBox::from_inspect(inspect),
            Err(DataBoxError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn decode_rejects_missing_volume() {
        let mut inspect = inspect_response(true, false);
        if let Some(config) = inspect.config.as_mut() {
            config.volumes = Some(HashMap::new());
        }
        assert!(matches!(
            DataBox::from_inspect(inspect),
            Err(DataBoxError::NoSharedVolume { .. })
        ));
    }

    #[test]
    fn decode_rejects_multiple_volumes() {
        let mut inspect = inspect_response(true, false);
        if let Some(config) = inspect.config.as_mut() {
            config.volumes = Some(HashMap::from([
                ("/data".to_string(), HashMap::new()),
                ("/other".to_string(), HashMap::new()),
            ]));
        }
        assert!(matches!(
            DataBox::from_inspect(inspect),
            Err(DataBoxError::NoSharedVolume { .. })
        ));
    }

    #[test]
    fn mountpoint_matches_shared_path() {
        let bx = DataBox::from_inspect(inspect_response(true, false)).unwrap();
        assert_eq!(
            bx.mountpoint().unwrap(),
            PathBuf::from("/var/lib/docker/volumes/xyz/_data")
        );
    }

    #[test]
    fn mountpoint_fails_fast_when_mount_absent() {
        let mut inspect = inspect_response(true, false);
        inspect.mounts = Some(Vec::new());
        let bx = DataBox::from_inspect(inspect).unwrap();
        assert!(matches!(
            bx.mountpoint(),
            Err(DataBoxError::SharedMountMissing { .. })
        ));
    }
}
