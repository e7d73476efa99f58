//! CRD YAML Generator
//!
//! Generates Kubernetes CRD YAML files from the types registered in the
//! scheme, so the manifests in config/crd/bases/ stay in sync with the Rust
//! code.
//!
//! Usage:
//!   cargo run --bin crdgen [output-dir]

use net_operator_api::scheme;
use std::fs;
use std::path::{Path, PathBuf};

const HEADER: &str = "# This file is AUTO-GENERATED from crates/net-operator-api
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/crd/bases"));

    fs::create_dir_all(&output_dir)?;

    println!("Generating CRD YAML files into {}...", output_dir.display());

    for registered in scheme().kinds() {
        let filename = format!(
            "{}_{}.yaml",
            registered.api_resource.group, registered.api_resource.plural
        );
        write_crd(&output_dir, &filename, &registered.crd())?;
    }

    println!("Done. Apply with: kubectl apply -f {}", output_dir.display());

    Ok(())
}

fn write_crd<T: serde::Serialize>(
    output_dir: &Path,
    filename: &str,
    crd: &T,
) -> Result<(), Box<dyn std::error::Error>> {
    let yaml = serde_yaml::to_string(crd)?;
    let content = format!("{HEADER}---\n{yaml}");

    fs::write(output_dir.join(filename), content)?;
    println!("  Generated {filename}");

    Ok(())
}
