//! Test environment error types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while starting or stopping a test environment.
#[derive(Debug, Error)]
pub enum EnvTestError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Manifest file or directory could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML manifest could not be parsed
    #[error("failed to parse YAML manifest {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// JSON manifest could not be parsed
    #[error("failed to parse JSON manifest {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Manifest is a CRD but unusable
    #[error("invalid CRD manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// No CRD manifests were found in the configured paths
    #[error("no CRD manifests found in {0}")]
    NoCrds(String),

    /// CRD did not become established in time
    #[error("timed out after {timeout:?} waiting for CRD {name} to be established")]
    Timeout { name: String, timeout: Duration },

    /// Waiting for a CRD condition failed
    #[error("failed waiting for CRD: {0}")]
    Wait(#[from] kube_runtime::wait::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}
