//! Error types for schema validation and type registration.
//!
//! The API server enforces most of these rules at admission time through the
//! OpenAPI schema; the same rules are checked here so clients can reject bad
//! objects before sending them.

use thiserror::Error;

/// Violations of the declared schema constraints.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Replica count exceeds the maximum allowed by the availability mode
    #[error("{mode} replicas must be at most {max}, got {replicas}")]
    ReplicasOutOfRange {
        /// Availability mode the replicas belong to
        mode: &'static str,
        /// Requested replica count
        replicas: u32,
        /// Largest count the mode allows
        max: u32,
    },

    /// Neither zones nor a custom placement were provided
    #[error("either zones or placementSpec must be set")]
    MissingPlacement,

    /// The sub-config of the non-selected availability mode was set
    #[error("{field} must not be set when availabilityMode is {mode}")]
    AvailabilitySpecMismatch {
        /// Selected availability mode
        mode: &'static str,
        /// Wire name of the offending field
        field: &'static str,
    },

    /// More workload networks than the schema allows
    #[error("at most 1 workload network is supported, got {0}")]
    TooManyWorkloadNetworks(usize),

    /// Syslog endpoint is not `[protocol://]host[:port]`
    #[error("invalid syslog endpoint {0:?}, expected [udp|tcp|tls://]host[:port]")]
    InvalidSyslogEndpoint(String),

    /// Requested IP is not a valid IP literal
    #[error("invalid requested IP {0:?}")]
    InvalidRequestedIp(String),

    /// Allocated IP in status is not a valid IP literal
    #[error("invalid allocated IP {0:?}")]
    InvalidAllocatedIp(String),

    /// Unknown enum value
    #[error("unknown {field} value {value:?}, expected one of: {expected}")]
    UnknownVariant {
        /// Wire name of the field
        field: &'static str,
        /// Value that was given
        value: String,
        /// Accepted values
        expected: &'static str,
    },
}

/// Errors raised by the type registry.
#[derive(Debug, Error)]
pub enum SchemeError {
    /// The object's type is not registered
    #[error("no kind {kind:?} is registered for version {api_version:?}")]
    NotRegistered {
        /// API version of the object
        api_version: String,
        /// Kind of the object
        kind: String,
    },

    /// The object's type does not match the requested type
    #[error("object is a {found}, expected {expected}")]
    KindMismatch {
        /// `apiVersion/kind` that was requested
        expected: String,
        /// `apiVersion/kind` of the object
        found: String,
    },

    /// Object could not be converted into the typed resource
    #[error("failed to decode object: {0}")]
    Decode(#[from] serde_json::Error),
}
