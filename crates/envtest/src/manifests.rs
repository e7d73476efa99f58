//! CRD manifest loading.
//!
//! Reads every `.yaml`, `.yml` and `.json` file from the configured paths.
//! YAML files may hold several documents; empty documents and documents of
//! other kinds are skipped.

use crate::error::EnvTestError;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CRD_KIND: &str = "CustomResourceDefinition";

/// Load all CRDs found in `paths`. Each path may be a file or a directory.
pub fn load_crds<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<CustomResourceDefinition>, EnvTestError> {
    let mut crds = Vec::new();

    for path in paths {
        let path = path.as_ref();
        for file in manifest_files(path)? {
            crds.extend(load_file(&file)?);
        }
    }

    if crds.is_empty() {
        let searched = paths
            .iter()
            .map(|p| p.as_ref().display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(EnvTestError::NoCrds(searched));
    }

    Ok(crds)
}

fn manifest_files(path: &Path) -> Result<Vec<PathBuf>, EnvTestError> {
    let io_err = |source| EnvTestError::Io {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(io_err)?;
    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(io_err)? {
        let entry_path = entry.map_err(io_err)?.path();
        if entry_path.is_file() && is_manifest(&entry_path) {
            files.push(entry_path);
        }
    }
    // Stable install order
    files.sort();
    Ok(files)
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

fn load_file(path: &Path) -> Result<Vec<CustomResourceDefinition>, EnvTestError> {
    let content = fs::read_to_string(path).map_err(|source| EnvTestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let documents = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        let value: serde_yaml::Value = serde_json::from_str(&content).map_err(|source| EnvTestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        vec![value]
    } else {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(&content) {
            let value = serde_yaml::Value::deserialize(document).map_err(|source| EnvTestError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
            documents.push(value);
        }
        documents
    };

    let mut crds = Vec::new();
    for document in documents {
        if document.is_null() {
            continue;
        }
        let kind = document.get("kind").and_then(serde_yaml::Value::as_str);
        if kind != Some(CRD_KIND) {
            debug!("Skipping {:?} document in {}", kind.unwrap_or("<none>"), path.display());
            continue;
        }

        let crd: CustomResourceDefinition =
            serde_yaml::from_value(document).map_err(|source| EnvTestError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        if crd.metadata.name.as_deref().is_none_or(str::is_empty) {
            return Err(EnvTestError::InvalidManifest {
                path: path.to_path_buf(),
                reason: "metadata.name is required".to_string(),
            });
        }
        debug!("Loaded CRD {} from {}", crd.metadata.name.as_deref().unwrap_or_default(), path.display());
        crds.push(crd);
    }

    Ok(crds)
}
