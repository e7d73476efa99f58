//! Kubernetes object references used across the netoperator CRDs
//!
//! Network, IP pool and network interface references all share the same
//! `kind`/`name`/`apiVersion` shape. They point at resources served by other
//! API groups, so the kind is free-form rather than an enum.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a Network object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkReference {
    /// Kind is the type of resource being referenced
    pub kind: String,

    /// Name is the name of resource being referenced
    pub name: String,

    /// API version of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl NetworkReference {
    /// Create a new reference with kind and name
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            api_version: None,
        }
    }

    /// Set the API version of the referent
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

/// Reference to an IPPool object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolReference {
    /// Kind is the type of resource being referenced
    pub kind: String,

    /// Name is the name of resource being referenced
    pub name: String,

    /// API version of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl IPPoolReference {
    /// Create a new reference with kind and name
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            api_version: None,
        }
    }

    /// Set the API version of the referent
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

/// Reference to a NetworkInterface object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceReference {
    /// Kind is the type of resource being referenced
    pub kind: String,

    /// Name is the name of resource being referenced
    pub name: String,

    /// API version of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl NetworkInterfaceReference {
    /// Create a new reference with kind and name
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            api_version: None,
        }
    }

    /// Set the API version of the referent
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

/// Reference to an object in the same namespace, following the core/v1
/// `TypedLocalObjectReference` shape:
/// - `apiGroup`: API group of the referenced resource (empty for the core group)
/// - `kind`: kind of the referenced resource
/// - `name`: name of the referenced resource
///
/// There is deliberately no namespace field; the referent always lives in the
/// namespace of the referencing object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypedLocalObjectReference {
    /// APIGroup is the group for the resource being referenced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,

    /// Kind is the type of resource being referenced
    pub kind: String,

    /// Name is the name of resource being referenced
    pub name: String,
}

impl TypedLocalObjectReference {
    /// Create a new reference in the core group
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_group: None,
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a new reference with an explicit API group
    pub fn with_api_group(
        api_group: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_group: Some(api_group.into()),
            kind: kind.into(),
            name: name.into(),
        }
    }
}
