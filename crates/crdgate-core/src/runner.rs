//! Seams to the external schema-diff checker.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use crdgate_contracts::RECORDED_RESULTS_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

use crate::config::{ConversionPolicy, EnforcementPolicy, RunnerConfig};
use crate::manifest::CustomResourceDefinition;
use crate::results::ValidationResults;

/// Compares an installed CRD against its proposed replacement.
pub trait ValidationRunner {
    fn run(
        &self,
        old: &CustomResourceDefinition,
        new: &CustomResourceDefinition,
    ) -> ValidationResults;
}

/// Builds a [`ValidationRunner`] for a given policy.
pub trait ValidationRegistry {
    fn runner<'a>(&'a self, config: &RunnerConfig)
        -> anyhow::Result<Box<dyn ValidationRunner + 'a>>;
}

/// Validation results recorded per CRD name and replayed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecordedResults {
    pub schema_version: String,
    #[serde(default)]
    pub crds: BTreeMap<String, ValidationResults>,
}

impl RecordedResults {
    pub fn new() -> Self {
        Self {
            schema_version: RECORDED_RESULTS_SCHEMA_VERSION.to_string(),
            crds: BTreeMap::new(),
        }
    }

    pub fn with_crd(mut self, name: impl Into<String>, results: ValidationResults) -> Self {
        self.crds.insert(name.into(), results);
        self
    }

    pub fn from_json_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let recorded: RecordedResults =
            serde_json::from_slice(bytes).context("parse recorded results")?;
        if recorded.schema_version.trim() != RECORDED_RESULTS_SCHEMA_VERSION {
            anyhow::bail!(
                "recorded results schema_version mismatch: expected {RECORDED_RESULTS_SCHEMA_VERSION} got {:?}",
                recorded.schema_version
            );
        }
        Ok(recorded)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read recorded results: {}", path.display()))?;
        Self::from_json_slice(&bytes).with_context(|| format!("load {}", path.display()))
    }
}

impl ValidationRegistry for RecordedResults {
    fn runner<'a>(
        &'a self,
        config: &RunnerConfig,
    ) -> anyhow::Result<Box<dyn ValidationRunner + 'a>> {
        config.validate().context("invalid runner config")?;
        Ok(Box::new(RecordedRunner {
            recorded: self,
            config: config.clone(),
        }))
    }
}

/// Replays [`RecordedResults`] under a [`RunnerConfig`].
pub struct RecordedRunner<'a> {
    recorded: &'a RecordedResults,
    config: RunnerConfig,
}

impl ValidationRunner for RecordedRunner<'_> {
    fn run(
        &self,
        _old: &CustomResourceDefinition,
        new: &CustomResourceDefinition,
    ) -> ValidationResults {
        let Some(recorded) = self.recorded.crds.get(new.name()) else {
            return ValidationResults::default();
        };
        let mut results = recorded.clone();

        if self.config.conversion == ConversionPolicy::Ignore && new.has_webhook_conversion() {
            tracing::debug!(crd = new.name(), "ignoring served version checks: webhook conversion");
            results.served_version_validation.clear();
        }

        results.retain_checks(|check| match self.config.enforcement_for(check) {
            EnforcementPolicy::Error => true,
            EnforcementPolicy::Warn => {
                tracing::warn!(crd = new.name(), check, "check failures downgraded to warnings");
                false
            }
            EnforcementPolicy::None => false,
        });
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::manifest::{CrdConversion, ObjectMeta};
    use crate::results::CheckResult;

    fn crd(name: &str, webhook: bool) -> CustomResourceDefinition {
        let mut crd = CustomResourceDefinition {
            metadata: ObjectMeta {
                name: name.to_string(),
            },
            ..Default::default()
        };
        if webhook {
            crd.spec.conversion = Some(CrdConversion {
                strategy: "Webhook".to_string(),
            });
        }
        crd
    }

    fn recorded() -> RecordedResults {
        let mut results = ValidationResults {
            crd_validation: vec![
                CheckResult::new("scope", vec!["scope changed".to_string()]),
                CheckResult::new("description", vec!["description changed".to_string()]),
            ],
            ..Default::default()
        };
        results
            .served_version_validation
            .entry("v1beta1".to_string())
            .or_default()
            .insert(
                "^.spec".to_string(),
                vec![CheckResult::new("type", vec!["type changed".to_string()])],
            );
        RecordedResults::new().with_crd("widgets.example.com", results)
    }

    #[test]
    fn unrecorded_crd_has_no_failures() {
        let rec = recorded();
        let runner = rec.runner(&RunnerConfig::default()).unwrap();
        let c = crd("gadgets.example.com", false);
        assert!(!runner.run(&c, &c).has_failures());
    }

    #[test]
    fn default_policy_drops_description_checks() {
        let rec = recorded();
        let runner = rec.runner(&RunnerConfig::default()).unwrap();
        let c = crd("widgets.example.com", false);
        let raws: Vec<String> = runner
            .run(&c, &c)
            .scoped_failures()
            .into_iter()
            .map(|f| f.raw)
            .collect();
        assert_eq!(raws, vec!["scope changed".to_string(), "type changed".to_string()]);
    }

    #[test]
    fn webhook_conversion_ignores_served_version_checks() {
        let rec = recorded();
        let c = crd("widgets.example.com", true);

        let runner = rec.runner(&RunnerConfig::default()).unwrap();
        assert!(runner.run(&c, &c).served_version_validation.is_empty());

        let cfg = RunnerConfig {
            conversion: ConversionPolicy::None,
            ..RunnerConfig::default()
        };
        let runner = rec.runner(&cfg).unwrap();
        assert!(!runner.run(&c, &c).served_version_validation.is_empty());
    }

    #[test]
    fn warn_and_none_enforcement_drop_failures() {
        let rec = recorded();
        let cfg = RunnerConfig {
            unhandled_enforcement: EnforcementPolicy::Warn,
            ..RunnerConfig::default()
        };
        let runner = rec.runner(&cfg).unwrap();
        let c = crd("widgets.example.com", false);
        assert!(!runner.run(&c, &c).has_failures());
    }

    #[test]
    fn invalid_config_fails_runner_creation() {
        let cfg = RunnerConfig {
            validations: vec![ValidationConfig {
                name: " ".to_string(),
                enforcement: EnforcementPolicy::Error,
                configuration: Default::default(),
            }],
            ..RunnerConfig::default()
        };
        assert!(recorded().runner(&cfg).is_err());
    }

    #[test]
    fn schema_version_is_checked() {
        let err = RecordedResults::from_json_slice(br#"{"schema_version":"other@1","crds":{}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("schema_version mismatch"));

        let ok = RecordedResults::from_json_slice(
            br#"{"schema_version":"crdgate.recorded-results@0.1.0","crds":{"a.example.com":{}}}"#,
        )
        .unwrap();
        assert!(ok.crds.contains_key("a.example.com"));
    }
}
