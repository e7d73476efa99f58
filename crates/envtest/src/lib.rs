//! Test Environment
//!
//! Installs CRD manifests from disk into a Kubernetes API server so sample
//! programs and integration tests can create resources, then removes them
//! again on shutdown.
//!
//! The API server is whatever the local kubeconfig (or in-cluster
//! environment) points at, typically a throwaway kind or k3d cluster.

pub mod env;
pub mod error;
pub mod manifests;
pub mod options;

pub use env::{TestEnv, with_test_env, with_test_env_client};
pub use error::EnvTestError;
pub use manifests::load_crds;
pub use options::EnvTestOptions;
