//! Type registry for generic clients.
//!
//! A [`Scheme`] records which kinds (and their list kinds) this crate serves,
//! how to address them on the API server, and how to generate their CRDs.
//! Generic code (dynamic clients, the CRD generator) goes through the scheme
//! instead of naming concrete types.

use crate::error::SchemeError;
use crate::foundation_load_balancer_config::FoundationLoadBalancerConfig;
use crate::ip_address_allocation::{IPAddressAllocation, ip_address_allocation_crd};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{CustomResourceExt, Resource};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// A kind known to the scheme.
#[derive(Debug, Clone)]
pub struct RegisteredType {
    /// How to address the kind on the API server
    pub api_resource: ApiResource,

    /// Kind of the list wrapper (e.g. `IPAddressAllocationList`)
    pub list_kind: String,

    crd: fn() -> CustomResourceDefinition,
}

impl RegisteredType {
    /// Group, version and kind of the registered type
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(
            &self.api_resource.group,
            &self.api_resource.version,
            &self.api_resource.kind,
        )
    }

    /// Generate the CRD for this kind
    pub fn crd(&self) -> CustomResourceDefinition {
        (self.crd)()
    }
}

/// Registry of kinds keyed by `(apiVersion, kind)`.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    types: BTreeMap<(String, String), RegisteredType>,
}

impl Scheme {
    /// An empty scheme
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind and its list kind.
    ///
    /// Returns `false` if the kind was already registered; registering twice
    /// has no further effect.
    pub fn register<K>(&mut self) -> bool
    where
        K: Resource<DynamicType = ()> + CustomResourceExt,
    {
        self.register_with_crd::<K>(K::crd)
    }

    /// Register a kind whose installed CRD differs from the derived one.
    pub fn register_with_crd<K>(&mut self, crd: fn() -> CustomResourceDefinition) -> bool
    where
        K: Resource<DynamicType = ()>,
    {
        let api_resource = ApiResource::erase::<K>(&());
        let key = (api_resource.api_version.clone(), api_resource.kind.clone());
        if self.types.contains_key(&key) {
            return false;
        }

        let list_kind = format!("{}List", api_resource.kind);
        self.types.insert(
            key,
            RegisteredType {
                api_resource,
                list_kind,
                crd,
            },
        );
        true
    }

    /// `true` if `kind` is a registered kind or list kind for `api_version`
    pub fn recognizes(&self, api_version: &str, kind: &str) -> bool {
        self.types.values().any(|t| {
            t.api_resource.api_version == api_version && (t.api_resource.kind == kind || t.list_kind == kind)
        })
    }

    /// How to address `K` on the API server, if registered
    pub fn api_resource<K>(&self) -> Option<&ApiResource>
    where
        K: Resource<DynamicType = ()>,
    {
        let key = (K::api_version(&()).into_owned(), K::kind(&()).into_owned());
        self.types.get(&key).map(|t| &t.api_resource)
    }

    /// Look up a kind by name across all registered versions
    pub fn api_resource_for_kind(&self, kind: &str) -> Option<&ApiResource> {
        self.types
            .values()
            .find(|t| t.api_resource.kind == kind)
            .map(|t| &t.api_resource)
    }

    /// Registered kinds, ordered by `(apiVersion, kind)`
    pub fn kinds(&self) -> impl Iterator<Item = &RegisteredType> {
        self.types.values()
    }

    /// CRDs for every registered kind, sorted by CRD name
    pub fn crds(&self) -> Vec<CustomResourceDefinition> {
        let mut crds: Vec<_> = self.types.values().map(RegisteredType::crd).collect();
        crds.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        crds
    }

    /// Convert a dynamic object into a typed resource.
    ///
    /// Objects without type information (as found in some list responses) are
    /// assumed to be of type `K`.
    pub fn decode<K>(&self, obj: &DynamicObject) -> Result<K, SchemeError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let api_version = K::api_version(&()).into_owned();
        let kind = K::kind(&()).into_owned();
        if !self.types.contains_key(&(api_version.clone(), kind.clone())) {
            return Err(SchemeError::NotRegistered { api_version, kind });
        }

        if let Some(types) = &obj.types {
            if !self.recognizes(&types.api_version, &types.kind) {
                return Err(SchemeError::NotRegistered {
                    api_version: types.api_version.clone(),
                    kind: types.kind.clone(),
                });
            }
            if types.api_version != api_version || types.kind != kind {
                return Err(SchemeError::KindMismatch {
                    expected: format!("{}/{}", api_version, kind),
                    found: format!("{}/{}", types.api_version, types.kind),
                });
            }
        }

        let mut value = serde_json::to_value(obj)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("apiVersion".to_string(), api_version.into());
            map.insert("kind".to_string(), kind.into());
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Register every kind of this crate with `scheme`.
pub fn add_to_scheme(scheme: &mut Scheme) {
    scheme.register::<FoundationLoadBalancerConfig>();
    scheme.register_with_crd::<IPAddressAllocation>(ip_address_allocation_crd);
}

/// A new scheme with every kind of this crate registered.
pub fn scheme() -> Scheme {
    let mut scheme = Scheme::new();
    add_to_scheme(&mut scheme);
    scheme
}
