//! Sample Controller Client
//!
//! Starts a test environment, creates a couple of `IPAddressAllocation` and
//! `FoundationLoadBalancerConfig` resources, then lists them back through a
//! dynamic client and decodes the results with the type registry.

use anyhow::{Context, anyhow};
use envtest::{EnvTestOptions, with_test_env};
use kube::api::{DynamicObject, ListParams, PostParams};
use kube::{Api, Client, Resource};
use net_operator_api::{
    FoundationLoadBalancerConfig, FoundationLoadBalancerConfigSpec, FoundationLoadBalancerDeploymentSpec,
    IPAddressAllocation, IPAddressAllocationSpec, NetworkReference, Scheme, TypedLocalObjectReference, scheme,
};
use serde::de::DeserializeOwned;
use std::env;
use tracing::{error, info};

const DEFAULT_CRD_DIRECTORY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/crd/bases");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        error!("Failed to install rustls crypto provider: {:?}", e);
    }

    let namespace = env::var("SAMPLE_NAMESPACE").unwrap_or_else(|_| "default".to_string());
    let options = EnvTestOptions::from_env(DEFAULT_CRD_DIRECTORY)?;

    info!("Configuration:");
    info!("  CRD paths: {:?}", options.crd_directory_paths);
    info!("  Namespace: {}", namespace);

    with_test_env(&options, |client| async move {
        let scheme = scheme();

        create_ip_address_allocations(&client, &namespace).await?;
        create_foundation_load_balancer_configs(&client, &namespace).await?;

        println!("IPAddressAllocations:");
        list::<IPAddressAllocation>(&client, &scheme, &namespace).await?;
        println!("FoundationLoadBalancerConfigs:");
        list::<FoundationLoadBalancerConfig>(&client, &scheme, &namespace).await?;

        Ok::<_, anyhow::Error>(())
    })
    .await
}

async fn create_ip_address_allocations(client: &Client, namespace: &str) -> anyhow::Result<()> {
    let api: Api<IPAddressAllocation> = Api::namespaced(client.clone(), namespace);
    for name in ["test-ipa1", "test-ipa2"] {
        let allocation = IPAddressAllocation::new(
            name,
            IPAddressAllocationSpec::new(TypedLocalObjectReference::new("Network", "primary")),
        );
        api.create(&PostParams::default(), &allocation)
            .await
            .with_context(|| format!("creating IPAddressAllocation {}", name))?;
        info!("Created IPAddressAllocation {}/{}", namespace, name);
    }
    Ok(())
}

async fn create_foundation_load_balancer_configs(client: &Client, namespace: &str) -> anyhow::Result<()> {
    let api: Api<FoundationLoadBalancerConfig> = Api::namespaced(client.clone(), namespace);
    for name in ["test-flb1", "test-flb2"] {
        let config = FoundationLoadBalancerConfig::new(
            name,
            FoundationLoadBalancerConfigSpec {
                deployment_spec: FoundationLoadBalancerDeploymentSpec {
                    storage_policy: "default-storage-policy".to_string(),
                    zones: vec!["zone-a".to_string()],
                    ..Default::default()
                },
                virtual_ip_network: NetworkReference::new("Network", "vip"),
                ..Default::default()
            },
        );
        config.spec.validate()?;
        api.create(&PostParams::default(), &config)
            .await
            .with_context(|| format!("creating FoundationLoadBalancerConfig {}", name))?;
        info!("Created FoundationLoadBalancerConfig {}/{}", namespace, name);
    }
    Ok(())
}

/// List `K` through a dynamic client and decode each item with the scheme.
async fn list<K>(client: &Client, scheme: &Scheme, namespace: &str) -> anyhow::Result<()>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    let resource = scheme
        .api_resource::<K>()
        .ok_or_else(|| anyhow!("{} is not registered", K::kind(&())))?;
    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, resource);

    for obj in api.list(&ListParams::default()).await? {
        let typed: K = scheme.decode(&obj)?;
        println!("- {}", typed.meta().name.as_deref().unwrap_or_default());
    }
    Ok(())
}
