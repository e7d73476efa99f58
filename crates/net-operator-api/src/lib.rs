//! Net Operator API
//!
//! Kubernetes Custom Resource Definitions for the `netoperator.vmware.com`
//! API group, version `v1alpha1`:
//! - `FoundationLoadBalancerConfig`: load balancer deployment topology and status
//! - `IPAddressAllocation`: IP address requests against a pool
//!
//! Reconciliation of these resources happens in external controllers. This
//! crate only declares the schema, a type registry for generic clients and a
//! typed clientset.

pub mod references;
pub mod conditions;
pub mod foundation_load_balancer_config;
pub mod ip_address_allocation;
pub mod scheme;
pub mod clientset;
pub mod error;

pub use references::*;
pub use conditions::*;
pub use foundation_load_balancer_config::*;
pub use ip_address_allocation::*;
pub use scheme::{Scheme, RegisteredType, add_to_scheme, scheme};
pub use clientset::NetoperatorV1alpha1Client;
pub use error::{ValidationError, SchemeError};

/// API group of every resource in this crate.
pub const GROUP: &str = "netoperator.vmware.com";

/// API version of every resource in this crate.
pub const VERSION: &str = "v1alpha1";
