//! Test environment configuration.
//!
//! Options are built in code or loaded from environment variables:
//! - `CRD_DIRECTORY`: colon-separated list of manifest files or directories
//! - `ENVTEST_ESTABLISHED_TIMEOUT_SECS`: how long to wait for each CRD

use crate::error::EnvTestError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const CRD_DIRECTORY_ENV: &str = "CRD_DIRECTORY";
pub const ESTABLISHED_TIMEOUT_ENV: &str = "ENVTEST_ESTABLISHED_TIMEOUT_SECS";

/// Default field manager for server-side apply
pub const DEFAULT_FIELD_MANAGER: &str = "envtest";

/// Default time to wait for each CRD to become established
pub const DEFAULT_ESTABLISHED_TIMEOUT: Duration = Duration::from_secs(30);

/// How to set up a test environment.
#[derive(Debug, Clone)]
pub struct EnvTestOptions {
    /// Files or directories holding CRD manifests
    pub crd_directory_paths: Vec<PathBuf>,

    /// Field manager used when applying CRDs
    pub field_manager: String,

    /// Time to wait for each CRD to become established
    pub established_timeout: Duration,
}

impl EnvTestOptions {
    pub fn new<I, P>(crd_directory_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            crd_directory_paths: crd_directory_paths.into_iter().map(Into::into).collect(),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            established_timeout: DEFAULT_ESTABLISHED_TIMEOUT,
        }
    }

    /// Load options from the environment, using `default_crd_directory` when
    /// `CRD_DIRECTORY` is unset.
    pub fn from_env(default_crd_directory: impl Into<PathBuf>) -> Result<Self, EnvTestError> {
        Self::from_vars(
            env::var(CRD_DIRECTORY_ENV).ok(),
            env::var(ESTABLISHED_TIMEOUT_ENV).ok(),
            default_crd_directory.into(),
        )
    }

    fn from_vars(
        crd_directory: Option<String>,
        established_timeout: Option<String>,
        default_crd_directory: PathBuf,
    ) -> Result<Self, EnvTestError> {
        let mut options = match crd_directory.filter(|d| !d.is_empty()) {
            Some(dirs) => Self::new(env::split_paths(&dirs)),
            None => Self::new([default_crd_directory]),
        };

        if let Some(raw) = established_timeout {
            let secs = raw.parse::<u64>().map_err(|_| {
                EnvTestError::Configuration(format!(
                    "{} must be a whole number of seconds, got {:?}",
                    ESTABLISHED_TIMEOUT_ENV, raw
                ))
            })?;
            options.established_timeout = Duration::from_secs(secs);
        }

        Ok(options)
    }

    #[must_use]
    pub fn with_established_timeout(mut self, timeout: Duration) -> Self {
        self.established_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }
}
