//! FoundationLoadBalancerConfig CRD
//!
//! Describes how a virtual load balancer is deployed (size, availability
//! mode, placement), which networks its nodes attach to, and the state the
//! controller observed after realizing it.

use crate::conditions::{Condition, HasConditions, is_status_condition_true};
use crate::error::ValidationError;
use crate::references::{IPPoolReference, NetworkInterfaceReference, NetworkReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum replicas in active-passive mode
pub const MAX_ACTIVE_PASSIVE_REPLICAS: u32 = 2;

/// Maximum replicas in single-node mode
pub const MAX_SINGLE_NODE_REPLICAS: u32 = 1;

/// Maximum number of workload networks
pub const MAX_WORKLOAD_NETWORKS: usize = 1;

/// Default syslog port for UDP and TCP endpoints
pub const DEFAULT_SYSLOG_PORT: u16 = 514;

/// Default syslog port for TLS endpoints
pub const DEFAULT_SYSLOG_TLS_PORT: u16 = 6514;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "netoperator.vmware.com",
    version = "v1alpha1",
    kind = "FoundationLoadBalancerConfig",
    namespaced,
    status = "FoundationLoadBalancerConfigStatus",
    shortname = "flb",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct FoundationLoadBalancerConfigSpec {
    /// Sizing and placement constraints of the load balancer
    pub deployment_spec: FoundationLoadBalancerDeploymentSpec,

    /// Network used to program node management interfaces.
    /// If unset, the virtual IP network carries management traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_network: Option<NetworkReference>,

    /// Network used to program node workload interfaces.
    /// If unset, workload traffic leaves through the virtual IP interface.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(length(max = 1))]
    pub workload_networks: Vec<NetworkReference>,

    /// Network used to program node VIP interfaces
    #[serde(rename = "virtualIPNetwork")]
    pub virtual_ip_network: NetworkReference,

    /// Network settings applied to the load balancer nodes
    #[serde(default)]
    pub network_spec: FoundationLoadBalancerNetworkConfigSpec,
}

impl FoundationLoadBalancerConfigSpec {
    /// Network carrying management traffic, falling back to the VIP network.
    pub fn management_network(&self) -> &NetworkReference {
        self.management_network
            .as_ref()
            .unwrap_or(&self.virtual_ip_network)
    }

    /// The workload network, if one is configured
    pub fn workload_network(&self) -> Option<&NetworkReference> {
        self.workload_networks.first()
    }

    /// Check the constraints the API server enforces at admission.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.deployment_spec.validate()?;

        if self.workload_networks.len() > MAX_WORKLOAD_NETWORKS {
            return Err(ValidationError::TooManyWorkloadNetworks(self.workload_networks.len()));
        }

        self.network_spec.validate()
    }
}

/// Node form factor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FoundationLoadBalancerSize {
    #[default]
    Small,
    Medium,
    Large,
    #[serde(rename = "xlarge")]
    XLarge,
}

impl FoundationLoadBalancerSize {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FoundationLoadBalancerSize::Small => "small",
            FoundationLoadBalancerSize::Medium => "medium",
            FoundationLoadBalancerSize::Large => "large",
            FoundationLoadBalancerSize::XLarge => "xlarge",
        }
    }
}

impl FromStr for FoundationLoadBalancerSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(FoundationLoadBalancerSize::Small),
            "medium" => Ok(FoundationLoadBalancerSize::Medium),
            "large" => Ok(FoundationLoadBalancerSize::Large),
            "xlarge" => Ok(FoundationLoadBalancerSize::XLarge),
            other => Err(ValidationError::UnknownVariant {
                field: "size",
                value: other.to_string(),
                expected: "small, medium, large, xlarge",
            }),
        }
    }
}

impl fmt::Display for FoundationLoadBalancerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the availability of the load balancer is deployed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FoundationLoadBalancerAvailabilityMode {
    /// Two nodes, one serving traffic and one on standby
    #[default]
    ActivePassive,

    /// One node, redeployed on a best-effort basis
    SingleNode,
}

impl FoundationLoadBalancerAvailabilityMode {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FoundationLoadBalancerAvailabilityMode::ActivePassive => "active-passive",
            FoundationLoadBalancerAvailabilityMode::SingleNode => "single-node",
        }
    }
}

impl FromStr for FoundationLoadBalancerAvailabilityMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active-passive" => Ok(FoundationLoadBalancerAvailabilityMode::ActivePassive),
            "single-node" => Ok(FoundationLoadBalancerAvailabilityMode::SingleNode),
            other => Err(ValidationError::UnknownVariant {
                field: "availabilityMode",
                value: other.to_string(),
                expected: "active-passive, single-node",
            }),
        }
    }
}

impl fmt::Display for FoundationLoadBalancerAvailabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition types reported in `FoundationLoadBalancerConfigStatus.conditions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoundationLoadBalancerConditionType {
    /// Health of the load balancer data plane runtime
    Healthy,

    /// Deployment status of the load balancer node(s)
    DeploymentStatusReady,

    /// Operation status of the load balancer instance
    OperationStatusReady,
}

impl FoundationLoadBalancerConditionType {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FoundationLoadBalancerConditionType::Healthy => "Healthy",
            FoundationLoadBalancerConditionType::DeploymentStatusReady => "DeploymentStatusReady",
            FoundationLoadBalancerConditionType::OperationStatusReady => "OperationStatusReady",
        }
    }
}

impl fmt::Display for FoundationLoadBalancerConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FoundationLoadBalancerConditionType> for String {
    fn from(value: FoundationLoadBalancerConditionType) -> Self {
        value.as_str().to_string()
    }
}

/// Placement strategy in effect for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement<'a> {
    /// Nodes are placed in the named zones
    Zones(&'a [String]),

    /// Nodes are placed on explicit vSphere objects
    Custom(&'a [CustomPlacementSpec]),
}

/// Describes how to deploy the load balancer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FoundationLoadBalancerDeploymentSpec {
    /// Node form factor
    #[serde(default)]
    pub size: FoundationLoadBalancerSize,

    /// vSphere Storage Policy ID which defines node storage placement
    pub storage_policy: String,

    /// Desired version. Defaults to the latest available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Zones eligible for placing nodes.
    /// If no zones are provided, a placement spec is required.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    /// How availability is deployed and configured
    #[serde(default)]
    pub availability_mode: FoundationLoadBalancerAvailabilityMode,

    /// Configuration for active-passive mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_passive_spec: Option<ActivePassiveAvailabilityMode>,

    /// Configuration for single-node mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_node_spec: Option<SingleModeAvailabilityMode>,

    /// Custom placement of load balancer nodes.
    /// Ignored when zones are specified.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placement_spec: Vec<CustomPlacementSpec>,
}

impl FoundationLoadBalancerDeploymentSpec {
    /// Placement strategy in effect. Zones take precedence over a custom
    /// placement; having neither is an error.
    pub fn placement(&self) -> Result<Placement<'_>, ValidationError> {
        if !self.zones.is_empty() {
            Ok(Placement::Zones(&self.zones))
        } else if !self.placement_spec.is_empty() {
            Ok(Placement::Custom(&self.placement_spec))
        } else {
            Err(ValidationError::MissingPlacement)
        }
    }

    /// Replica count of the selected availability mode
    pub fn replicas(&self) -> u32 {
        match self.availability_mode {
            FoundationLoadBalancerAvailabilityMode::ActivePassive => self
                .active_passive_spec
                .as_ref()
                .map_or(MAX_ACTIVE_PASSIVE_REPLICAS, |s| s.replicas),
            FoundationLoadBalancerAvailabilityMode::SingleNode => self
                .single_node_spec
                .as_ref()
                .map_or(MAX_SINGLE_NODE_REPLICAS, |s| s.replicas),
        }
    }

    /// Check the availability sub-config, replica bounds and placement
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mode = self.availability_mode.as_str();
        match self.availability_mode {
            FoundationLoadBalancerAvailabilityMode::ActivePassive => {
                if self.single_node_spec.is_some() {
                    return Err(ValidationError::AvailabilitySpecMismatch {
                        mode,
                        field: "singleNodeSpec",
                    });
                }
                if let Some(spec) = &self.active_passive_spec {
                    spec.validate()?;
                }
            }
            FoundationLoadBalancerAvailabilityMode::SingleNode => {
                if self.active_passive_spec.is_some() {
                    return Err(ValidationError::AvailabilitySpecMismatch {
                        mode,
                        field: "activePassiveSpec",
                    });
                }
                if let Some(spec) = &self.single_node_spec {
                    spec.validate()?;
                }
            }
        }

        self.placement().map(|_| ())
    }
}

fn default_active_passive_replicas() -> u32 {
    MAX_ACTIVE_PASSIVE_REPLICAS
}

fn default_single_node_replicas() -> u32 {
    MAX_SINGLE_NODE_REPLICAS
}

/// Two nodes in active-passive mode: one active node serves traffic while the
/// passive node waits for a fail-over. Connections may be reset on fail-over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivePassiveAvailabilityMode {
    /// Total number of deployed nodes
    #[serde(default = "default_active_passive_replicas")]
    #[schemars(range(max = 2))]
    pub replicas: u32,
}

impl ActivePassiveAvailabilityMode {
    /// Create a config, rejecting more than two replicas
    pub fn new(replicas: u32) -> Result<Self, ValidationError> {
        let mode = Self { replicas };
        mode.validate()?;
        Ok(mode)
    }

    /// Check the replica bound
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.replicas > MAX_ACTIVE_PASSIVE_REPLICAS {
            return Err(ValidationError::ReplicasOutOfRange {
                mode: "active-passive",
                replicas: self.replicas,
                max: MAX_ACTIVE_PASSIVE_REPLICAS,
            });
        }
        Ok(())
    }
}

impl Default for ActivePassiveAvailabilityMode {
    fn default() -> Self {
        Self {
            replicas: MAX_ACTIVE_PASSIVE_REPLICAS,
        }
    }
}

/// Single node configuration: trades availability for reduced resource
/// consumption. Redeployment after a node failure is best-effort.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SingleModeAvailabilityMode {
    /// Total number of deployed nodes
    #[serde(default = "default_single_node_replicas")]
    #[schemars(range(max = 1))]
    pub replicas: u32,
}

impl SingleModeAvailabilityMode {
    /// Create a config, rejecting more than one replica
    pub fn new(replicas: u32) -> Result<Self, ValidationError> {
        let mode = Self { replicas };
        mode.validate()?;
        Ok(mode)
    }

    /// Check the replica bound
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.replicas > MAX_SINGLE_NODE_REPLICAS {
            return Err(ValidationError::ReplicasOutOfRange {
                mode: "single-node",
                replicas: self.replicas,
                max: MAX_SINGLE_NODE_REPLICAS,
            });
        }
        Ok(())
    }
}

impl Default for SingleModeAvailabilityMode {
    fn default() -> Self {
        Self {
            replicas: MAX_SINGLE_NODE_REPLICAS,
        }
    }
}

/// Explicit placement of load balancer nodes outside a Supervisor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomPlacementSpec {
    /// Managed Object ID of a vSphere ClusterComputeResource
    pub cluster: String,

    /// Managed Object ID of a vSphere ResourcePool
    pub resource_pool: String,

    /// Managed Object ID of a vSphere Folder.
    /// Defaults to the Namespaces folder created on the cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

/// Network settings applied to the load balancer nodes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FoundationLoadBalancerNetworkConfigSpec {
    /// IPPools used for load balancer IP addresses
    #[serde(rename = "virtualServerIPPools", default)]
    pub virtual_server_ip_pools: Vec<IPPoolReference>,

    /// Subnets in CIDR notation directly connected to the virtual IP network.
    /// The virtual server IP pools must fall within the virtual IP network
    /// subnet or one of these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_server_subnets: Vec<String>,

    /// DNS servers, reachable from the management network
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,

    /// Domains resolvable on the DNS servers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_search_domains: Vec<String>,

    /// NTP servers, reachable from the management network
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ntp_servers: Vec<String>,

    /// Syslog server as `[protocol://]host[:port]`.
    /// If empty, nodes log locally.
    /// The API server stores any string; client-side validation only accepts
    /// udp, tcp and tls endpoints with bracketed IPv6 hosts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_endpoint: Option<String>,

    /// PEM certificate used to verify a TLS syslog endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_certificate: Option<String>,
}

impl FoundationLoadBalancerNetworkConfigSpec {
    /// Parsed syslog endpoint, if configured
    pub fn syslog(&self) -> Result<Option<SyslogEndpoint>, ValidationError> {
        self.syslog_endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(SyslogEndpoint::parse)
            .transpose()
    }

    /// Check that the syslog endpoint, if set, parses
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.syslog().map(|_| ())
    }
}

/// Syslog transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyslogProtocol {
    /// Plain UDP, the default
    Udp,
    /// Plain TCP
    Tcp,
    /// TCP with TLS
    Tls,
}

impl SyslogProtocol {
    /// Port used when the endpoint names none
    pub fn default_port(&self) -> u16 {
        match self {
            SyslogProtocol::Udp | SyslogProtocol::Tcp => DEFAULT_SYSLOG_PORT,
            SyslogProtocol::Tls => DEFAULT_SYSLOG_TLS_PORT,
        }
    }
}

/// A parsed `[protocol://]host[:port]` syslog endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogEndpoint {
    /// Transport
    pub protocol: SyslogProtocol,
    /// Host name or IP, without brackets
    pub host: String,
    /// Port, defaulted from the protocol
    pub port: u16,
}

impl SyslogEndpoint {
    /// Parse an endpoint. The protocol defaults to UDP and the port to the
    /// protocol's well-known port. IPv6 hosts must be bracketed.
    pub fn parse(endpoint: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidSyslogEndpoint(endpoint.to_string());

        let (protocol, rest) = match endpoint.split_once("://") {
            Some((scheme, rest)) => {
                let protocol = match scheme.to_ascii_lowercase().as_str() {
                    "udp" => SyslogProtocol::Udp,
                    "tcp" => SyslogProtocol::Tcp,
                    "tls" => SyslogProtocol::Tls,
                    _ => return Err(invalid()),
                };
                (protocol, rest)
            }
            None => (SyslogProtocol::Udp, endpoint),
        };

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, after) = bracketed.split_once(']').ok_or_else(invalid)?;
            let port = if after.is_empty() {
                None
            } else {
                Some(after.strip_prefix(':').ok_or_else(invalid)?)
            };
            (host, port)
        } else {
            match rest.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (rest, None),
            }
        };

        if host.is_empty() || host.contains('/') {
            return Err(invalid());
        }

        let port = match port {
            Some(p) => p.parse::<u16>().map_err(|_| invalid())?,
            None => protocol.default_port(),
        };

        Ok(Self {
            protocol,
            host: host.to_string(),
            port,
        })
    }
}

/// Observed state of the load balancer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FoundationLoadBalancerConfigStatus {
    /// Currently deployed version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Per-node information
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<FoundationLoadBalancerNodeStatus>,

    /// Virtual server IP address utilization
    #[serde(rename = "virtualServerIPPoolsUtilization", default)]
    pub virtual_server_ip_pools_utilization: VirtualIPPoolsUtilization,

    /// States of the load balancer at specific points in time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl FoundationLoadBalancerConfigStatus {
    /// `true` when the Healthy condition is True
    pub fn is_healthy(&self) -> bool {
        is_status_condition_true(
            &self.conditions,
            FoundationLoadBalancerConditionType::Healthy.as_str(),
        )
    }
}

/// Per-node status of the load balancer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FoundationLoadBalancerNodeStatus {
    /// Unique node identifier
    #[serde(rename = "nodeID")]
    pub node_id: String,

    /// Management network interface, if it exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_network_interface: Option<NetworkInterfaceReference>,

    /// Workload network interfaces, if they exist
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workload_network_interfaces: Vec<NetworkInterfaceReference>,

    /// Interface bound to the virtual IP network
    pub vip_network_interface: NetworkInterfaceReference,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// IP address utilization of the virtual server IP pools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualIPPoolsUtilization {
    /// Virtual IP addresses currently allocated to services
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ips_allocated: i64,

    /// Virtual IP addresses eligible to be used for services
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ips_available: i64,
}

impl HasConditions for FoundationLoadBalancerConfig {
    type Condition = Condition;

    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }

    fn set_conditions(&mut self, conditions: Vec<Condition>) {
        self.status.get_or_insert_with(Default::default).conditions = conditions;
    }
}
