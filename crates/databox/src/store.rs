//! The box repository: create, find, list, delete, exec, and copy over the
//! engine API.
//!
//! `exec` and `copy` go through transient helper containers whose combined
//! stdout/stderr is surfaced as an [`OutputStream`]; the helper is removed by
//! [`OutputStream::finish`] once the caller drains the stream.

use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    RemoveContainerOptions,
};
use bollard::models::HostConfig;
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::boxes::{DATA_ONLY_LABEL, DataBox};
use crate::error::{DataBoxError, DataBoxResult};
use crate::location::{DST_MOUNT, Location, SRC_MOUNT, mount_path};

/// Default image for boxes and transient helper containers.
pub const BASE_IMAGE: &str = "busybox:latest";

/// Repository of data-only containers on one engine.
#[derive(Debug, Clone)]
pub struct BoxStore {
    engine: Docker,
}

impl BoxStore {
    /// Create a repository over an engine client handle.
    #[must_use]
    pub fn new(engine: Docker) -> Self {
        Self { engine }
    }

    /// Create a box named `name` with an empty volume declared at `volume`.
    ///
    /// The container runs `/bin/true` with entrypoint `chroot <volume>`, has
    /// networking disabled, and carries the `data-only` label. It is started
    /// once so the volume materializes, after which it sits exited.
    ///
    /// # Errors
    ///
    /// Propagates engine failures; the started container is re-inspected and
    /// must decode into a valid box.
    pub async fn create(
        &self,
        name: &str,
        volume: &str,
        image: Option<&str>,
    ) -> DataBoxResult<DataBox> {
        let image = image.unwrap_or(BASE_IMAGE);
        let options = CreateContainerOptions {
            name,
            platform: None,
        };
        let config = Config {
            image: Some(image.to_string()),
            cmd: Some(vec!["/bin/true".to_string()]),
            entrypoint: Some(vec!["chroot".to_string(), volume.to_string()]),
            labels: Some(HashMap::from([(
                DATA_ONLY_LABEL.to_string(),
                String::new(),
            )])),
            volumes: Some(HashMap::from([(volume.to_string(), HashMap::new())])),
            network_disabled: Some(true),
            ..Default::default()
        };

        let created = self.engine.create_container(Some(options), config).await?;
        self.engine
            .start_container::<String>(&created.id, None)
            .await?;
        tracing::info!(name = %name, volume = %volume, image = %image, "Created box");

        let inspect = self.engine.inspect_container(&created.id, None).await?;
        DataBox::from_inspect(inspect)
    }

    /// Look up a box by name or container ID.
    ///
    /// # Errors
    ///
    /// Returns [`DataBoxError::BoxNotFound`] when the container does not
    /// exist (404 on inspect) or exists but fails the box predicate; any
    /// other engine error propagates unchanged.
    pub async fn find(&self, name: &str) -> DataBoxResult<DataBox> {
        let inspect = match self.engine.inspect_container(name, None).await {
            Ok(inspect) => inspect,
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                return Err(DataBoxError::BoxNotFound {
                    name: name.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        if !DataBox::is_box(&inspect) {
            return Err(DataBoxError::BoxNotFound {
                name: name.to_string(),
            });
        }
        DataBox::from_inspect(inspect)
    }

    /// List all boxes: containers labeled `data-only` with status `exited`.
    ///
    /// One engine list call per invocation, then one inspect per hit to build
    /// the typed records. A labeled container that fails to decode into a
    /// valid box (no single declared volume, missing fields) is skipped with
    /// a warning rather than aborting the listing. The result is sorted by
    /// name.
    ///
    /// # Errors
    ///
    /// Propagates engine failures.
    pub async fn list(&self) -> DataBoxResult<Vec<DataBox>> {
        let options = ListContainersOptions {
            all: true,
            filters: HashMap::from([
                ("label".to_string(), vec![DATA_ONLY_LABEL.to_string()]),
                ("status".to_string(), vec!["exited".to_string()]),
            ]),
            ..Default::default()
        };

        let summaries = self.engine.list_containers(Some(options)).await?;
        let mut records = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = summary
                .id
                .ok_or(DataBoxError::MalformedContainer { field: "Id" })?;
            records.push(self.engine.inspect_container(&id, None).await?);
        }

        let mut boxes = decode_listing(records);
        boxes.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(boxes)
    }

    /// Remove a box's container together with its volumes.
    ///
    /// # Errors
    ///
    /// A container that no longer exists surfaces the engine error unchanged
    /// rather than being treated as already deleted.
    pub async fn delete(&self, bx: &DataBox) -> DataBoxResult<()> {
        self.engine
            .remove_container(
                bx.id(),
                Some(RemoveContainerOptions {
                    v: true,
                    ..Default::default()
                }),
            )
            .await?;
        tracing::info!(name = %bx.name(), "Deleted box");
        Ok(())
    }

    /// Run `command` in a transient container that sees the box's volumes.
    ///
    /// The helper uses the default image, the box's shared path as working
    /// directory, and `volumes_from` the box's container.
    ///
    /// # Errors
    ///
    /// Propagates engine failures from container creation or start.
    pub async fn run(&self, bx: &DataBox, command: Vec<String>) -> DataBoxResult<OutputStream> {
        let config = Config {
            image: Some(BASE_IMAGE.to_string()),
            cmd: Some(command),
            working_dir: Some(bx.shared_path().to_string()),
            host_config: Some(HostConfig {
                volumes_from: Some(vec![bx.id().to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.spawn_helper(config).await
    }

    /// Copy files between two endpoints (`<path>` or `<box>:<path>`).
    ///
    /// Binds the source mount point read-only at `/mnt/src` and the
    /// destination mount point read-write at `/mnt/dst`, then runs
    /// `cp -afv` inside a transient helper container.
    ///
    /// # Errors
    ///
    /// Fails when either endpoint names an unknown box or its mount point
    /// cannot be resolved; engine failures propagate unchanged.
    pub async fn copy(&self, src: &str, dst: &str) -> DataBoxResult<OutputStream> {
        let src = Location::resolve(self, src).await?;
        let dst = Location::resolve(self, dst).await?;

        let (binds, cmd) = copy_invocation(
            &src.mountpoint()?,
            src.path(),
            &dst.mountpoint()?,
            dst.path(),
        );
        let config = Config {
            image: Some(BASE_IMAGE.to_string()),
            cmd: Some(cmd),
            host_config: Some(HostConfig {
                binds: Some(binds),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.spawn_helper(config).await
    }

    /// Create and start an anonymous helper container, returning its live
    /// combined stdout/stderr stream.
    async fn spawn_helper(&self, config: Config<String>) -> DataBoxResult<OutputStream> {
        let created = self
            .engine
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await?;
        self.engine
            .start_container::<String>(&created.id, None)
            .await?;
        tracing::debug!(container = %created.id, "Started helper container");

        let logs = self.engine.logs(
            &created.id,
            Some(LogsOptions::<String> {
                follow: true,
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );
        Ok(OutputStream {
            engine: self.engine.clone(),
            container_id: created.id,
            inner: Box::pin(logs),
        })
    }
}

/// Decode listed container records, dropping the ones that are not valid
/// boxes.
fn decode_listing(records: Vec<bollard::models::ContainerInspectResponse>) -> Vec<DataBox> {
    records
        .into_iter()
        .filter_map(|inspect| {
            let id = inspect.id.clone().unwrap_or_default();
            match DataBox::from_inspect(inspect) {
                Ok(bx) => Some(bx),
                Err(err) => {
                    tracing::warn!(container = %id, error = %err, "Skipping labeled container that is not a valid box");
                    None
                }
            }
        })
        .collect()
}

/// Bind strings and `cp` invocation for a copy between two mount points.
fn copy_invocation(
    src_mount: &Path,
    src_path: &str,
    dst_mount: &Path,
    dst_path: &str,
) -> (Vec<String>, Vec<String>) {
    let binds = vec![
        format!("{}:{SRC_MOUNT}:ro", src_mount.display()),
        format!("{}:{DST_MOUNT}", dst_mount.display()),
    ];
    let cmd = vec![
        "cp".to_string(),
        "-afv".to_string(),
        mount_path(SRC_MOUNT, src_path),
        mount_path(DST_MOUNT, dst_path),
    ];
    (binds, cmd)
}

/// Live log output of a transient helper container.
///
/// The stream stays open until the remote container exits; the caller awaits
/// it to exhaustion and then calls [`OutputStream::finish`] to remove the
/// helper.
pub struct OutputStream {
    engine: Docker,
    container_id: String,
    inner: Pin<Box<dyn Stream<Item = Result<LogOutput, bollard::errors::Error>> + Send>>,
}

impl OutputStream {
    /// ID of the helper container producing this stream.
    #[must_use]
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Next chunk of combined stdout/stderr, or `None` once the helper exits.
    pub async fn next_chunk(&mut self) -> Option<DataBoxResult<Bytes>> {
        self.inner
            .next()
            .await
            .map(|chunk| chunk.map(LogOutput::into_bytes).map_err(DataBoxError::from))
    }

    /// Remove the helper container.
    ///
    /// # Errors
    ///
    /// Propagates the engine error if removal fails.
    pub async fn finish(self) -> DataBoxResult<()> {
        self.engine
            .remove_container(
                &self.container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        tracing::debug!(container = %self.container_id, "Removed helper container");
        Ok(())
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("container_id", &self.container_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, ContainerInspectResponse, ContainerState};
    use std::path::PathBuf;

    fn exited_labeled_record(name: &str, volumes: &[&str]) -> ContainerInspectResponse {
        ContainerInspectResponse {
            id: Some(format!("{name}-id")),
            name: Some(format!("/{name}")),
            state: Some(ContainerState {
                running: Some(false),
                ..Default::default()
            }),
            config: Some(ContainerConfig {
                labels: Some(HashMap::from([(
                    DATA_ONLY_LABEL.to_string(),
                    String::new(),
                )])),
                volumes: Some(
                    volumes
                        .iter()
                        .map(|path| ((*path).to_string(), HashMap::new()))
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn listing_skips_records_that_are_not_valid_boxes() {
        let records = vec![
            exited_labeled_record("data1", &["/data"]),
            // Labeled and exited, but no single declared volume.
            exited_labeled_record("stray-multi", &["/a", "/b"]),
            exited_labeled_record("stray-empty", &[]),
        ];

        let boxes = decode_listing(records);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].name(), "data1");
        assert_eq!(boxes[0].shared_path(), "/data");
    }

    #[test]
    fn listing_skips_records_missing_required_fields() {
        let mut broken = exited_labeled_record("data2", &["/data"]);
        broken.state = None;

        let boxes = decode_listing(vec![exited_labeled_record("data1", &["/data"]), broken]);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].name(), "data1");
    }

    #[test]
    fn copy_invocation_binds_src_read_only() {
        let (binds, _) = copy_invocation(
            &PathBuf::from("/var/lib/docker/volumes/xyz/_data"),
            "/data/file.txt",
            &PathBuf::from("/home/user/work"),
            "./out",
        );
        assert_eq!(
            binds,
            vec![
                "/var/lib/docker/volumes/xyz/_data:/mnt/src:ro".to_string(),
                "/home/user/work:/mnt/dst".to_string(),
            ]
        );
    }

    #[test]
    fn copy_invocation_joins_paths_under_binds() {
        let (_, cmd) = copy_invocation(
            &PathBuf::from("/var/lib/docker/volumes/xyz/_data"),
            "/data/file.txt",
            &PathBuf::from("/home/user/work"),
            "./out",
        );
        assert_eq!(
            cmd,
            vec![
                "cp".to_string(),
                "-afv".to_string(),
                "/mnt/src/data/file.txt".to_string(),
                "/mnt/dst/out".to_string(),
            ]
        );
    }

    #[test]
    fn copy_invocation_empty_dst_targets_bind_root() {
        let (_, cmd) = copy_invocation(
            &PathBuf::from("/src"),
            "file.txt",
            &PathBuf::from("/dst"),
            "",
        );
        assert_eq!(cmd[3], "/mnt/dst");
    }
}
