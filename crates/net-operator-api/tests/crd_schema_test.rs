//! Generated CRD shape tests
//!
//! The API server enforces enums and bounds from these schemas at admission,
//! so they must carry the same constraints as the Rust types.

use kube::CustomResourceExt;
use net_operator_api::{FoundationLoadBalancerConfig, IPAddressAllocation, ip_address_allocation_crd};
use serde_json::Value;

/// Depth-first search for the first value stored under `key`
fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

fn spec_schema<K: CustomResourceExt>() -> Value {
    let crd = serde_json::to_value(K::crd()).unwrap();
    crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]["spec"].clone()
}

#[test]
fn test_flb_crd_names() {
    let crd = FoundationLoadBalancerConfig::crd();
    assert_eq!(
        crd.metadata.name.as_deref(),
        Some("foundationloadbalancerconfigs.netoperator.vmware.com")
    );
    assert_eq!(crd.spec.group, "netoperator.vmware.com");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert_eq!(crd.spec.names.short_names, Some(vec!["flb".to_string()]));
    assert_eq!(crd.spec.versions[0].name, "v1alpha1");
    assert!(crd.spec.versions[0]
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());
}

#[test]
fn test_flb_schema_enums() {
    let spec = spec_schema::<FoundationLoadBalancerConfig>();
    let deployment = &spec["properties"]["deploymentSpec"]["properties"];

    let sizes = find_key(&deployment["size"], "enum").unwrap();
    assert_eq!(sizes, &serde_json::json!(["small", "medium", "large", "xlarge"]));

    let modes = find_key(&deployment["availabilityMode"], "enum").unwrap();
    assert_eq!(modes, &serde_json::json!(["active-passive", "single-node"]));
}

#[test]
fn test_flb_schema_bounds() {
    let spec = spec_schema::<FoundationLoadBalancerConfig>();
    let deployment = &spec["properties"]["deploymentSpec"]["properties"];

    let active_passive_max = find_key(&deployment["activePassiveSpec"], "maximum").unwrap();
    assert_eq!(active_passive_max.as_f64(), Some(2.0));

    let single_node_max = find_key(&deployment["singleNodeSpec"], "maximum").unwrap();
    assert_eq!(single_node_max.as_f64(), Some(1.0));

    let max_items = find_key(&spec["properties"]["workloadNetworks"], "maxItems").unwrap();
    assert_eq!(max_items.as_u64(), Some(1));
}

#[test]
fn test_flb_required_fields() {
    let spec = spec_schema::<FoundationLoadBalancerConfig>();
    let required = spec["required"].as_array().unwrap();
    assert!(required.contains(&Value::from("deploymentSpec")));
    assert!(required.contains(&Value::from("virtualIPNetwork")));
    assert!(!required.contains(&Value::from("managementNetwork")));
}

#[test]
fn test_ip_address_allocation_crd() {
    let crd = IPAddressAllocation::crd();
    assert_eq!(
        crd.metadata.name.as_deref(),
        Some("ipaddressallocations.netoperator.vmware.com")
    );
    assert_eq!(crd.spec.names.kind, "IPAddressAllocation");

    let spec = spec_schema::<IPAddressAllocation>();
    assert!(spec["properties"].get("poolRef").is_some());
    assert!(spec["properties"].get("requestedIP").is_some());
    let required = spec["required"].as_array().unwrap();
    assert_eq!(required, &vec![Value::from("poolRef")]);
}

#[test]
fn test_ip_address_allocation_has_no_status_subresource() {
    let crd = ip_address_allocation_crd();
    assert!(crd.spec.versions.iter().all(|v| v.subresources.is_none()));

    let schema = serde_json::to_value(&crd).unwrap();
    let root = &schema["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"];
    assert!(root.get("status").is_some());
}

#[test]
fn test_condition_reason_schema_is_structural() {
    let crd = serde_json::to_value(ip_address_allocation_crd()).unwrap();
    let condition = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]["status"]
        ["properties"]["conditions"]["items"]["properties"];
    let reason = &condition["reason"];

    assert!(find_key(reason, "anyOf").is_none());
    assert!(find_key(reason, "oneOf").is_none());
    assert_eq!(reason["type"], "string");
    assert_eq!(reason["nullable"], true);
    assert_eq!(
        reason["enum"],
        serde_json::json!(["InvalidRequestedIP", "CannotAllocIP", "IPPoolRefRetrievalFailed", null])
    );
}
