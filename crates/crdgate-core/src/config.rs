use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementPolicy {
    #[default]
    Error,
    Warn,
    None,
}

impl EnforcementPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementPolicy::Error => "error",
            EnforcementPolicy::Warn => "warn",
            EnforcementPolicy::None => "none",
        }
    }
}

impl fmt::Display for EnforcementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionPolicy {
    None,
    #[default]
    Ignore,
}

impl ConversionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionPolicy::None => "none",
            ConversionPolicy::Ignore => "ignore",
        }
    }
}

impl fmt::Display for ConversionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PolicyParseError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} {:?} (expected one of: {})",
            self.kind, self.value, self.expected
        )
    }
}

impl std::error::Error for PolicyParseError {}

impl FromStr for EnforcementPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "error" => Ok(EnforcementPolicy::Error),
            "warn" | "warning" => Ok(EnforcementPolicy::Warn),
            "none" => Ok(EnforcementPolicy::None),
            _ => Err(PolicyParseError {
                kind: "enforcement policy",
                value: s,
                expected: "error, warn, none",
            }),
        }
    }
}

impl FromStr for ConversionPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "none" => Ok(ConversionPolicy::None),
            "ignore" => Ok(ConversionPolicy::Ignore),
            _ => Err(PolicyParseError {
                kind: "conversion policy",
                value: s,
                expected: "none, ignore",
            }),
        }
    }
}

#[cfg(feature = "clap")]
impl clap::ValueEnum for EnforcementPolicy {
    fn value_variants<'a>() -> &'a [Self] {
        const ALL: [EnforcementPolicy; 3] = [
            EnforcementPolicy::Error,
            EnforcementPolicy::Warn,
            EnforcementPolicy::None,
        ];
        &ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            EnforcementPolicy::Error => Some(clap::builder::PossibleValue::new("error")),
            EnforcementPolicy::Warn => {
                Some(clap::builder::PossibleValue::new("warn").alias("warning"))
            }
            EnforcementPolicy::None => Some(clap::builder::PossibleValue::new("none")),
        }
    }
}

#[cfg(feature = "clap")]
impl clap::ValueEnum for ConversionPolicy {
    fn value_variants<'a>() -> &'a [Self] {
        const ALL: [ConversionPolicy; 2] = [ConversionPolicy::None, ConversionPolicy::Ignore];
        &ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationConfig {
    pub name: String,
    #[serde(default)]
    pub enforcement: EnforcementPolicy,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configuration: BTreeMap<String, Value>,
}

/// Policy handed to a [`crate::runner::ValidationRegistry`] when building a runner.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub conversion: ConversionPolicy,
    #[serde(default)]
    pub unhandled_enforcement: EnforcementPolicy,
    #[serde(default)]
    pub validations: Vec<ValidationConfig>,
}

impl Default for RunnerConfig {
    /// Strictest built-in policy: fail closed on unknown checks, never block on
    /// description edits, and allow enum value additions.
    fn default() -> Self {
        let mut enum_configuration = BTreeMap::new();
        enum_configuration.insert(
            "additionPolicy".to_string(),
            Value::String("Allow".to_string()),
        );
        Self {
            conversion: ConversionPolicy::Ignore,
            unhandled_enforcement: EnforcementPolicy::Error,
            validations: vec![
                ValidationConfig {
                    name: "description".to_string(),
                    enforcement: EnforcementPolicy::None,
                    configuration: BTreeMap::new(),
                },
                ValidationConfig {
                    name: "enum".to_string(),
                    enforcement: EnforcementPolicy::Error,
                    configuration: enum_configuration,
                },
            ],
        }
    }
}

impl RunnerConfig {
    pub fn from_json_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let cfg: RunnerConfig = serde_json::from_slice(bytes).context("parse runner config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read runner config: {}", path.display()))?;
        Self::from_json_slice(&bytes).with_context(|| format!("load {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for (idx, v) in self.validations.iter().enumerate() {
            let name = v.name.trim();
            if name.is_empty() {
                anyhow::bail!("validations[{idx}].name must be non-empty");
            }
            if !seen.insert(name) {
                anyhow::bail!("validations[{idx}] duplicates check {name:?}");
            }
        }
        Ok(())
    }

    pub fn validation(&self, check: &str) -> Option<&ValidationConfig> {
        self.validations.iter().find(|v| v.name == check)
    }

    /// Enforcement for `check`, falling back to `unhandled_enforcement`.
    pub fn enforcement_for(&self, check: &str) -> EnforcementPolicy {
        self.validation(check)
            .map(|v| v.enforcement)
            .unwrap_or(self.unhandled_enforcement)
    }
}
