use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Version name -> property path -> per-check results.
pub type PropertyResults = BTreeMap<String, BTreeMap<String, Vec<CheckResult>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckResult {
    pub name: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            name: name.into(),
            errors,
        }
    }
}

/// Output of one validation run over an (existing, proposed) CRD pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationResults {
    #[serde(default)]
    pub crd_validation: Vec<CheckResult>,
    #[serde(default)]
    pub same_version_validation: PropertyResults,
    #[serde(default)]
    pub served_version_validation: PropertyResults,
}

/// A raw failure string with the location it was reported at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedFailure {
    pub context: String,
    pub raw: String,
}

impl ValidationResults {
    pub fn has_failures(&self) -> bool {
        self.crd_validation.iter().any(|r| !r.errors.is_empty())
            || has_property_failures(&self.same_version_validation)
            || has_property_failures(&self.served_version_validation)
    }

    /// Flattens every result shape into ordered `(context, raw)` pairs.
    ///
    /// Whole-object failures come first (context: check name), then same-version
    /// failures (`<version>.<property>.<check>`), then served-version failures
    /// (`served version: <check>`). Maps are walked in key order.
    pub fn scoped_failures(&self) -> Vec<ScopedFailure> {
        let mut out = Vec::new();

        for result in &self.crd_validation {
            for raw in &result.errors {
                out.push(ScopedFailure {
                    context: result.name.clone(),
                    raw: raw.clone(),
                });
            }
        }

        for (version, properties) in &self.same_version_validation {
            for (property, results) in properties {
                for result in results {
                    for raw in &result.errors {
                        out.push(ScopedFailure {
                            context: format!("{version}.{property}.{}", result.name),
                            raw: raw.clone(),
                        });
                    }
                }
            }
        }

        for properties in self.served_version_validation.values() {
            for results in properties.values() {
                for result in results {
                    for raw in &result.errors {
                        out.push(ScopedFailure {
                            context: format!("served version: {}", result.name),
                            raw: raw.clone(),
                        });
                    }
                }
            }
        }

        out
    }

    /// Drops every check result whose name does not satisfy `keep`.
    pub fn retain_checks(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.crd_validation.retain(|r| keep(&r.name));
        for map in [
            &mut self.same_version_validation,
            &mut self.served_version_validation,
        ] {
            for properties in map.values_mut() {
                for results in properties.values_mut() {
                    results.retain(|r| keep(&r.name));
                }
            }
        }
    }
}

fn has_property_failures(map: &PropertyResults) -> bool {
    map.values()
        .flat_map(|properties| properties.values())
        .flatten()
        .any(|r| !r.errors.is_empty())
}
