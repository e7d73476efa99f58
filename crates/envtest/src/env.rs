//! Test environment lifecycle.
//!
//! [`TestEnv::start`] installs the CRD manifests into the API server the local
//! kubeconfig points at, waits until every CRD is established, and hands back
//! an explicit handle. [`TestEnv::stop`] removes the CRDs this environment
//! created, which also garbage-collects every object created from them. CRDs
//! that were already present are updated in place and left installed.

use crate::error::EnvTestError;
use crate::manifests::load_crds;
use crate::options::EnvTestOptions;
use futures::FutureExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::{Api, Client};
use kube_runtime::wait::{await_condition, conditions};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, warn};

/// A running test environment.
pub struct TestEnv {
    client: Client,
    /// CRDs created by this environment, removed on stop
    installed: Vec<String>,
}

impl TestEnv {
    /// Load the manifests, connect to the API server and install the CRDs.
    pub async fn start(options: &EnvTestOptions) -> Result<Self, EnvTestError> {
        let crds = load_crds(&options.crd_directory_paths)?;
        info!("Loaded {} CRD manifest(s)", crds.len());

        // Create Kubernetes client
        let client = Client::try_default().await?;

        Self::start_with_client(client, options, crds).await
    }

    /// Install `crds` using an existing client.
    ///
    /// Only CRDs that did not exist beforehand are recorded as installed. On
    /// failure, those are removed again before the error is returned.
    pub async fn start_with_client(
        client: Client,
        options: &EnvTestOptions,
        crds: Vec<CustomResourceDefinition>,
    ) -> Result<Self, EnvTestError> {
        let api: Api<CustomResourceDefinition> = Api::all(client.clone());
        let pp = PatchParams::apply(&options.field_manager).force();

        let mut env = Self {
            client,
            installed: Vec::with_capacity(crds.len()),
        };
        let mut applied = Vec::with_capacity(crds.len());

        for crd in crds {
            let Some(name) = crd.metadata.name.clone() else {
                continue;
            };

            let existed = match api.get_opt(&name).await {
                Ok(found) => found.is_some(),
                Err(e) => {
                    error!("Failed to look up CRD {}: {}", name, e);
                    env.cleanup_after_failed_start().await;
                    return Err(e.into());
                }
            };

            info!("Installing CRD {}", name);
            if let Err(e) = api.patch(&name, &pp, &Patch::Apply(&crd)).await {
                error!("Failed to install CRD {}: {}", name, e);
                env.cleanup_after_failed_start().await;
                return Err(e.into());
            }

            if existed {
                debug!("CRD {} already present, leaving it installed on stop", name);
            } else {
                env.installed.push(name.clone());
            }
            applied.push(name);
        }

        if let Err(e) = wait_established(&api, &applied, options).await {
            error!("{}", e);
            env.cleanup_after_failed_start().await;
            return Err(e);
        }

        info!("Test env ready with {} CRD(s)", env.installed.len());
        Ok(env)
    }

    /// Client connected to the environment's API server
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Names of the CRDs created by this environment
    pub fn installed_crds(&self) -> &[String] {
        &self.installed
    }

    /// Remove the installed CRDs and release the environment.
    pub async fn stop(self) -> Result<(), EnvTestError> {
        info!("Stopping test env");
        self.uninstall().await
    }

    async fn cleanup_after_failed_start(&self) {
        if let Err(e) = self.uninstall().await {
            warn!("Failed to clean up after failed start: {}", e);
        }
    }

    async fn uninstall(&self) -> Result<(), EnvTestError> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let mut first_error = None;

        for name in self.installed.iter().rev() {
            match api.delete(name, &DeleteParams::default()).await {
                Ok(_) => debug!("Deleted CRD {}", name),
                Err(kube::Error::Api(resp)) if resp.code == 404 => {
                    debug!("CRD {} already gone", name);
                }
                Err(e) => {
                    warn!("Failed to delete CRD {}: {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

async fn wait_established(
    api: &Api<CustomResourceDefinition>,
    names: &[String],
    options: &EnvTestOptions,
) -> Result<(), EnvTestError> {
    for name in names {
        debug!("Waiting for CRD {} to be established", name);
        let established = await_condition(api.clone(), name, conditions::is_crd_established());
        match tokio::time::timeout(options.established_timeout, established).await {
            Ok(result) => {
                result?;
            }
            Err(_) => {
                return Err(EnvTestError::Timeout {
                    name: name.clone(),
                    timeout: options.established_timeout,
                });
            }
        }
    }
    Ok(())
}

impl std::fmt::Debug for TestEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEnv")
            .field("installed", &self.installed)
            .finish_non_exhaustive()
    }
}

/// Run `f` inside a test environment connected through the local kubeconfig.
///
/// The environment is stopped whether `f` succeeds, fails or panics. A panic
/// is resumed once the environment is gone; an error from `f` takes
/// precedence over an error from stopping.
pub async fn with_test_env<F, Fut, T, E>(options: &EnvTestOptions, f: F) -> Result<T, E>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<EnvTestError>,
{
    let crds = load_crds(&options.crd_directory_paths)?;
    let client = Client::try_default().await.map_err(EnvTestError::from)?;
    let env = TestEnv::start_with_client(client, options, crds).await?;
    run_in_env(env, f).await
}

/// Like [`with_test_env`], using an existing client.
pub async fn with_test_env_client<F, Fut, T, E>(client: Client, options: &EnvTestOptions, f: F) -> Result<T, E>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<EnvTestError>,
{
    let crds = load_crds(&options.crd_directory_paths)?;
    let env = TestEnv::start_with_client(client, options, crds).await?;
    run_in_env(env, f).await
}

async fn run_in_env<F, Fut, T, E>(env: TestEnv, f: F) -> Result<T, E>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<EnvTestError>,
{
    let client = env.client();

    let outcome = AssertUnwindSafe(async move { f(client).await })
        .catch_unwind()
        .await;
    let stopped = env.stop().await;

    match outcome {
        Err(panic) => {
            if let Err(e) = stopped {
                warn!("Failed to stop test env: {}", e);
            }
            std::panic::resume_unwind(panic)
        }
        Ok(Err(e)) => {
            if let Err(stop_err) = stopped {
                warn!("Failed to stop test env: {}", stop_err);
            }
            Err(e)
        }
        Ok(Ok(value)) => {
            stopped?;
            Ok(value)
        }
    }
}
