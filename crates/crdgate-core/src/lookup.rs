//! Retrieval of the currently installed CRD by name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;
use walkdir::WalkDir;

use crate::manifest::{manifest_objects, CustomResourceDefinition};

#[derive(Debug, Error)]
pub enum LookupError {
    /// No CRD with this name is installed. Recoverable: there is nothing to break.
    #[error("customresourcedefinition {name:?} not found")]
    NotFound { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LookupError {
    pub fn not_found(name: impl Into<String>) -> Self {
        LookupError::NotFound { name: name.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

pub trait CrdLookup {
    fn get(&self, name: &str) -> Result<CustomResourceDefinition, LookupError>;
}

impl CrdLookup for BTreeMap<String, CustomResourceDefinition> {
    fn get(&self, name: &str) -> Result<CustomResourceDefinition, LookupError> {
        BTreeMap::get(self, name)
            .cloned()
            .ok_or_else(|| LookupError::not_found(name))
    }
}

impl<T: CrdLookup + ?Sized> CrdLookup for &T {
    fn get(&self, name: &str) -> Result<CustomResourceDefinition, LookupError> {
        (**self).get(name)
    }
}

/// Installed CRDs read from a directory of YAML/JSON manifests.
///
/// Files are indexed once at construction; non-CRD documents are ignored.
#[derive(Debug, Clone)]
pub struct DirectoryLookup {
    root: PathBuf,
    crds: BTreeMap<String, CustomResourceDefinition>,
}

impl DirectoryLookup {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("installed CRD directory not found: {}", root.display());
        }

        let mut crds = BTreeMap::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walk {}", root.display()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_manifest_file(path) {
                continue;
            }
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read: {}", path.display()))?;
            let source = path.display().to_string();
            for obj in manifest_objects(&text, &source)? {
                if !obj.is_crd() {
                    continue;
                }
                let crd = obj.to_crd().with_context(|| format!("in {source}"))?;
                if crds.insert(crd.name().to_string(), crd).is_some() {
                    anyhow::bail!("duplicate installed CRD {:?} in {source}", obj.name);
                }
            }
        }
        tracing::debug!(root = %root.display(), count = crds.len(), "indexed installed CRDs");

        Ok(Self {
            root: root.to_path_buf(),
            crds,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.crds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crds.is_empty()
    }
}

fn is_manifest_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

impl CrdLookup for DirectoryLookup {
    fn get(&self, name: &str) -> Result<CustomResourceDefinition, LookupError> {
        self.crds.get(name).cloned().ok_or_else(|| LookupError::not_found(name))
    }
}
