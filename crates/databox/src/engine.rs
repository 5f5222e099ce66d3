//! Engine connection configuration.
//!
//! Every repository holds an explicit [`bollard::Docker`] handle built from an
//! [`EngineConfig`]; there is no ambient global client.

use std::path::PathBuf;

use bollard::{API_DEFAULT_VERSION, Docker};
use url::Url;

use crate::error::{DataBoxError, DataBoxResult};

/// Control-call timeout, in seconds, for every engine request.
const ENGINE_TIMEOUT_SECS: u64 = 120;

/// Classified engine address derived from a host URL.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EngineAddr {
    /// Unix domain socket path.
    Unix(String),
    /// Plain HTTP over TCP.
    Http(String),
    /// HTTPS over TCP with client certificates from the given directory.
    Ssl(String, PathBuf),
}

/// Connection settings for a container engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine host URL (`unix://...` or `tcp://...`).
    host: String,
    /// Directory holding `cert.pem`, `key.pem`, and `ca.pem` for TLS over TCP.
    cert_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Create a connection configuration from a host URL and an optional
    /// certificate directory.
    pub fn new(host: impl Into<String>, cert_path: Option<PathBuf>) -> Self {
        Self {
            host: host.into(),
            cert_path,
        }
    }

    /// Connect to the engine, returning the client handle.
    ///
    /// `unix://` hosts connect over the socket path. `tcp://` hosts connect
    /// over HTTPS with client certificates when a certificate directory is
    /// configured, plain HTTP otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`DataBoxError::InvalidEngineHost`] for unparseable URLs or
    /// unsupported schemes, and propagates client construction failures.
    pub fn connect(&self) -> DataBoxResult<Docker> {
        let addr = self.classify()?;
        let docker = match addr {
            EngineAddr::Unix(path) => {
                Docker::connect_with_unix(&path, ENGINE_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            EngineAddr::Http(addr) => {
                Docker::connect_with_http(&addr, ENGINE_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            EngineAddr::Ssl(addr, dir) => Docker::connect_with_ssl(
                &addr,
                &dir.join("key.pem"),
                &dir.join("cert.pem"),
                &dir.join("ca.pem"),
                ENGINE_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            )?,
        };
        tracing::debug!(host = %self.host, "Connected to container engine");
        Ok(docker)
    }

    /// Classify the host URL into a concrete connection strategy.
    fn classify(&self) -> DataBoxResult<EngineAddr> {
        let url = Url::parse(&self.host).map_err(|_| DataBoxError::InvalidEngineHost {
            host: self.host.clone(),
        })?;

        match url.scheme() {
            // Docker tooling emits both `unix:///path` and the legacy
            // `unix://path` form, where the first path component lands in the
            // URL authority. Reassemble it.
            "unix" => {
                let socket = match url.host_str() {
                    Some(host) if !host.is_empty() => format!("/{host}{}", url.path()),
                    _ => url.path().to_string(),
                };
                Ok(EngineAddr::Unix(socket))
            }
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| DataBoxError::InvalidEngineHost {
                        host: self.host.clone(),
                    })?;
                let authority = match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
                match &self.cert_path {
                    Some(dir) => Ok(EngineAddr::Ssl(
                        format!("https://{authority}"),
                        dir.clone(),
                    )),
                    None => Ok(EngineAddr::Http(format!("http://{authority}"))),
                }
            }
            _ => Err(DataBoxError::InvalidEngineHost {
                host: self.host.clone(),
            }),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("unix:///var/run/docker.sock", None)
    }
}
