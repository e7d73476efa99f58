//! Typed clientset for the `netoperator.vmware.com/v1alpha1` group.
//!
//! One accessor per kind, each returning a namespaced [`kube::Api`].

use crate::foundation_load_balancer_config::FoundationLoadBalancerConfig;
use crate::ip_address_allocation::IPAddressAllocation;
use kube::{Api, Client};

/// Client for the resources of this API group.
#[derive(Clone)]
pub struct NetoperatorV1alpha1Client {
    client: Client,
}

impl NetoperatorV1alpha1Client {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the local kubeconfig or in-cluster environment
    pub async fn try_default() -> Result<Self, kube::Error> {
        Ok(Self::new(Client::try_default().await?))
    }

    /// The underlying Kubernetes client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// `FoundationLoadBalancerConfig` resources in `namespace`
    pub fn foundation_load_balancer_configs(&self, namespace: &str) -> Api<FoundationLoadBalancerConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// `IPAddressAllocation` resources in `namespace`
    pub fn ip_address_allocations(&self, namespace: &str) -> Api<IPAddressAllocation> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for NetoperatorV1alpha1Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetoperatorV1alpha1Client").finish_non_exhaustive()
    }
}

impl From<Client> for NetoperatorV1alpha1Client {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}
