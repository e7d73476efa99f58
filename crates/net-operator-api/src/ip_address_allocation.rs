//! IPAddressAllocation CRD
//!
//! Requests an IP address from a pool. The allocating controller reports the
//! result through `status.ipaddress` and typed conditions; failures are
//! expressed as a `Failure` condition carrying one of the reason codes below.

use crate::conditions::{ConditionStatus, HasConditions, StatusCondition};
use crate::error::ValidationError;
use crate::references::TypedLocalObjectReference;
use chrono::{DateTime, Utc};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{CustomResource, CustomResourceExt, ResourceExt};
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Finalizer that lets the controller clean up resources associated with an
/// IPAddressAllocation before it is removed from the API server.
pub const IP_ADDRESS_ALLOCATION_FINALIZER: &str = "ipaddressallocation.netoperator.vmware.com";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[kube(
    group = "netoperator.vmware.com",
    version = "v1alpha1",
    kind = "IPAddressAllocation",
    namespaced,
    status = "IPAddressAllocationStatus",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct IPAddressAllocationSpec {
    /// Reference to the network's IP pool within the namespace.
    /// Currently only a Network is supported.
    pub pool_ref: TypedLocalObjectReference,

    /// Specific IP to request. If omitted, any single address is allocated.
    #[serde(rename = "requestedIP", default, skip_serializing_if = "Option::is_none")]
    pub requested_ip: Option<String>,
}

/// CRD for `IPAddressAllocation` as installed on the API server.
///
/// The allocator writes status through the main resource endpoint, so the
/// status subresource emitted by the derive is removed.
pub fn ip_address_allocation_crd() -> CustomResourceDefinition {
    let mut crd = IPAddressAllocation::crd();
    for version in &mut crd.spec.versions {
        version.subresources = None;
    }
    crd
}

impl IPAddressAllocationSpec {
    /// Create a spec requesting any address from the pool
    pub fn new(pool_ref: TypedLocalObjectReference) -> Self {
        Self {
            pool_ref,
            requested_ip: None,
        }
    }

    /// Parsed requested IP. An empty string counts as not requested.
    pub fn requested_ip(&self) -> Result<Option<IpAddr>, ValidationError> {
        match self.requested_ip.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<IpAddr>()
                .map(Some)
                .map_err(|_| ValidationError::InvalidRequestedIp(raw.to_string())),
        }
    }

    /// Check that `requestedIP`, if set, is an IP literal
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.requested_ip().map(|_| ())
    }
}

/// Condition types reported in `IPAddressAllocationStatus.conditions`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum IPAddressAllocationConditionType {
    /// The IP has been allocated
    Ready,

    /// An error was encountered during allocation
    Failure,
}

impl IPAddressAllocationConditionType {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IPAddressAllocationConditionType::Ready => "Ready",
            IPAddressAllocationConditionType::Failure => "Failure",
        }
    }
}

impl fmt::Display for IPAddressAllocationConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason for the last transition of a condition. The values are part of the
/// status contract and must not change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum IPAddressAllocationConditionReason {
    /// The requested IP is invalid
    InvalidRequestedIP,

    /// No IP could be allocated
    CannotAllocIP,

    /// The pool reference could not be retrieved
    IPPoolRefRetrievalFailed,
}

impl IPAddressAllocationConditionReason {
    /// Every reason, in declaration order
    pub const ALL: [IPAddressAllocationConditionReason; 3] = [
        IPAddressAllocationConditionReason::InvalidRequestedIP,
        IPAddressAllocationConditionReason::CannotAllocIP,
        IPAddressAllocationConditionReason::IPPoolRefRetrievalFailed,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IPAddressAllocationConditionReason::InvalidRequestedIP => "InvalidRequestedIP",
            IPAddressAllocationConditionReason::CannotAllocIP => "CannotAllocIP",
            IPAddressAllocationConditionReason::IPPoolRefRetrievalFailed => "IPPoolRefRetrievalFailed",
        }
    }
}

impl fmt::Display for IPAddressAllocationConditionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of an IPAddressAllocation at a specific point in time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IPAddressAllocationCondition {
    /// Type of the condition
    pub r#type: IPAddressAllocationConditionType,

    /// Whether the condition is True, False, or Unknown
    pub status: ConditionStatus,

    /// Timestamp of the last change to the condition's status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Machine-readable explanation for the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "optional_reason_schema")]
    pub reason: Option<IPAddressAllocationConditionReason>,

    /// Human-readable explanation for the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Flat nullable enum for `reason`. The derived `anyOf` form is not a
/// structural schema and is rejected by the API server.
fn optional_reason_schema(_: &mut SchemaGenerator) -> Schema {
    let mut values: Vec<serde_json::Value> = IPAddressAllocationConditionReason::ALL
        .iter()
        .map(|reason| reason.as_str().into())
        .collect();
    values.push(serde_json::Value::Null);

    json_schema!({
        "description": "Machine-readable explanation for the last transition",
        "type": "string",
        "enum": values,
        "nullable": true,
    })
}

impl IPAddressAllocationCondition {
    /// `Ready=True`, stamped now
    pub fn ready() -> Self {
        Self {
            r#type: IPAddressAllocationConditionType::Ready,
            status: ConditionStatus::True,
            last_transition_time: Some(Utc::now()),
            reason: None,
            message: None,
        }
    }

    /// `Failure=True` with a reason code, stamped now
    pub fn failure(reason: IPAddressAllocationConditionReason, message: impl Into<String>) -> Self {
        Self {
            r#type: IPAddressAllocationConditionType::Failure,
            status: ConditionStatus::True,
            last_transition_time: Some(Utc::now()),
            reason: Some(reason),
            message: Some(message.into()),
        }
    }
}

impl From<&ValidationError> for IPAddressAllocationCondition {
    fn from(err: &ValidationError) -> Self {
        let reason = match err {
            ValidationError::InvalidRequestedIp(_) => IPAddressAllocationConditionReason::InvalidRequestedIP,
            _ => IPAddressAllocationConditionReason::CannotAllocIP,
        };
        Self::failure(reason, err.to_string())
    }
}

impl StatusCondition for IPAddressAllocationCondition {
    fn condition_type(&self) -> &str {
        self.r#type.as_str()
    }

    fn condition_status(&self) -> ConditionStatus {
        self.status
    }

    fn last_transition_time(&self) -> Option<DateTime<Utc>> {
        self.last_transition_time
    }

    fn set_last_transition_time(&mut self, time: DateTime<Utc>) {
        self.last_transition_time = Some(time);
    }
}

/// Observed state of the allocation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IPAddressAllocationStatus {
    /// The allocated IP address
    #[serde(rename = "ipaddress", default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Detailed information about the allocation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<IPAddressAllocationCondition>,
}

impl IPAddressAllocationStatus {
    /// Parsed allocated IP. An empty string counts as not allocated.
    pub fn allocated_ip(&self) -> Result<Option<IpAddr>, ValidationError> {
        match self.ip_address.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<IpAddr>()
                .map(Some)
                .map_err(|_| ValidationError::InvalidAllocatedIp(raw.to_string())),
        }
    }

    /// `true` when Ready is True and an address is recorded
    pub fn is_ready(&self) -> bool {
        let ready = self.conditions.iter().any(|c| {
            c.r#type == IPAddressAllocationConditionType::Ready && c.status == ConditionStatus::True
        });
        ready && self.ip_address.as_deref().is_some_and(|ip| !ip.is_empty())
    }

    /// The active failure condition, if any
    pub fn failure(&self) -> Option<&IPAddressAllocationCondition> {
        self.conditions.iter().find(|c| {
            c.r#type == IPAddressAllocationConditionType::Failure && c.status == ConditionStatus::True
        })
    }
}

impl IPAddressAllocation {
    /// `true` if the cleanup finalizer is attached
    pub fn has_finalizer(&self) -> bool {
        self.finalizers()
            .iter()
            .any(|f| f == IP_ADDRESS_ALLOCATION_FINALIZER)
    }
}

impl HasConditions for IPAddressAllocation {
    type Condition = IPAddressAllocationCondition;

    fn conditions(&self) -> &[IPAddressAllocationCondition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }

    fn set_conditions(&mut self, conditions: Vec<IPAddressAllocationCondition>) {
        self.status.get_or_insert_with(Default::default).conditions = conditions;
    }
}
