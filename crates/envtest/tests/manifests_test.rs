//! Tests for CRD manifest loading

use envtest::{EnvTestError, load_crds};
use net_operator_api::scheme;
use std::fs;
use std::path::PathBuf;

const WIDGET_CRD: &str = r#"apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  names:
    kind: Widget
    plural: widgets
  scope: Namespaced
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
"#;

fn committed_manifests() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/crd/bases")
}

#[test]
fn test_load_multi_document_file() {
    let dir = tempfile::tempdir().unwrap();
    let gadget = WIDGET_CRD
        .replace("widgets", "gadgets")
        .replace("Widget", "Gadget");
    let content = format!(
        "# leading comment\n---\n{WIDGET_CRD}---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: ignored\n---\n{gadget}"
    );
    fs::write(dir.path().join("crds.yaml"), content).unwrap();

    let crds = load_crds(&[dir.path()]).unwrap();
    let names: Vec<_> = crds.iter().filter_map(|c| c.metadata.name.clone()).collect();
    assert_eq!(names, vec!["widgets.example.com", "gadgets.example.com"]);
}

#[test]
fn test_load_skips_other_extensions_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.yml"), WIDGET_CRD.replace("widgets", "bees")).unwrap();
    fs::write(dir.path().join("a.yaml"), WIDGET_CRD).unwrap();
    fs::write(dir.path().join("README.md"), "not a manifest").unwrap();

    let crds = load_crds(&[dir.path()]).unwrap();
    let names: Vec<_> = crds.iter().filter_map(|c| c.metadata.name.clone()).collect();
    assert_eq!(names, vec!["widgets.example.com", "bees.example.com"]);
}

#[test]
fn test_load_json_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let value: serde_json::Value = serde_yaml::from_str(WIDGET_CRD).unwrap();
    fs::write(dir.path().join("widget.json"), serde_json::to_string_pretty(&value).unwrap()).unwrap();

    let crds = load_crds(&[dir.path().join("widget.json")]).unwrap();
    assert_eq!(crds.len(), 1);
    assert_eq!(crds[0].spec.names.kind, "Widget");
}

#[test]
fn test_empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_crds(&[dir.path()]).unwrap_err();
    assert!(matches!(err, EnvTestError::NoCrds(_)));
}

#[test]
fn test_missing_directory_is_an_error() {
    let err = load_crds(&[PathBuf::from("/nonexistent/crd/bases")]).unwrap_err();
    assert!(matches!(err, EnvTestError::Io { .. }));
}

#[test]
fn test_crd_without_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bad.yaml"),
        WIDGET_CRD.replace("  name: widgets.example.com\n", "  labels: {}\n"),
    )
    .unwrap();
    let err = load_crds(&[dir.path()]).unwrap_err();
    assert!(matches!(err, EnvTestError::InvalidManifest { .. }));
}

#[test]
fn test_committed_manifests_match_types() {
    let crds = load_crds(&[committed_manifests()]).unwrap();

    let mut committed: Vec<_> = crds.iter().filter_map(|c| c.metadata.name.clone()).collect();
    committed.sort();
    let expected: Vec<_> = scheme()
        .crds()
        .into_iter()
        .filter_map(|c| c.metadata.name)
        .collect();
    assert_eq!(committed, expected);

    for generated in scheme().crds() {
        let on_disk = crds
            .iter()
            .find(|c| c.metadata.name == generated.metadata.name)
            .unwrap();
        assert_eq!(
            on_disk.spec, generated.spec,
            "{} is stale, regenerate it with crdgen",
            generated.metadata.name.as_deref().unwrap_or_default()
        );
    }
}
