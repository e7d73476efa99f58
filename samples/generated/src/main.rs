//! Sample Generated Client
//!
//! Same flow as the controller sample, but every call goes through the typed
//! `NetoperatorV1alpha1Client`.

use anyhow::Context;
use envtest::{EnvTestOptions, with_test_env};
use kube::api::{ListParams, PostParams};
use net_operator_api::{
    ActivePassiveAvailabilityMode, FoundationLoadBalancerConfig, FoundationLoadBalancerConfigSpec,
    FoundationLoadBalancerDeploymentSpec, IPAddressAllocation, IPAddressAllocationSpec, IPPoolReference,
    NetoperatorV1alpha1Client, NetworkReference, TypedLocalObjectReference,
};
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
    info!("Using namespace {}", namespace);

    with_test_env(&options, |client| async move {
        let netoperator = NetoperatorV1alpha1Client::new(client);
        let pp = PostParams::default();

        let allocations = netoperator.ip_address_allocations(&namespace);
        for name in ["test-ipa1", "test-ipa2"] {
            let allocation = IPAddressAllocation::new(
                name,
                IPAddressAllocationSpec::new(TypedLocalObjectReference::new("Network", "primary")),
            );
            allocations
                .create(&pp, &allocation)
                .await
                .with_context(|| format!("creating IPAddressAllocation {}", name))?;
        }

        let configs = netoperator.foundation_load_balancer_configs(&namespace);
        for name in ["test-flb1", "test-flb2"] {
            let mut spec = FoundationLoadBalancerConfigSpec {
                deployment_spec: FoundationLoadBalancerDeploymentSpec {
                    storage_policy: "default-storage-policy".to_string(),
                    zones: vec!["zone-a".to_string()],
                    active_passive_spec: Some(ActivePassiveAvailabilityMode::new(2)?),
                    ..Default::default()
                },
                virtual_ip_network: NetworkReference::new("Network", "vip"),
                ..Default::default()
            };
            spec.network_spec
                .virtual_server_ip_pools
                .push(IPPoolReference::new("IPPool", "vip-pool"));
            spec.validate()?;

            configs
                .create(&pp, &FoundationLoadBalancerConfig::new(name, spec))
                .await
                .with_context(|| format!("creating FoundationLoadBalancerConfig {}", name))?;
        }

        println!("IPAddressAllocations:");
        for allocation in allocations.list(&ListParams::default()).await? {
            println!("- {}", allocation.metadata.name.unwrap_or_default());
        }

        println!("FoundationLoadBalancerConfigs:");
        for config in configs.list(&ListParams::default()).await? {
            println!("- {}", config.metadata.name.unwrap_or_default());
        }

        Ok::<_, anyhow::Error>(())
    })
    .await
}
