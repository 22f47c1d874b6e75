//! Release manifests and the typed CRD view the gate works with.

use anyhow::Context;
use crdgate_contracts::{CRD_API_VERSION, CRD_KIND};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A rendered release: a name plus its multi-document manifest text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub name: String,
    pub manifest: String,
}

impl Release {
    pub fn new(name: impl Into<String>, manifest: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manifest: manifest.into(),
        }
    }
}

/// One object from a manifest, with its type descriptor pulled out.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestObject {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub raw: Value,
}

impl ManifestObject {
    fn from_value(raw: Value) -> Self {
        let field = |v: Option<&Value>| v.and_then(Value::as_str).unwrap_or("").to_string();
        Self {
            api_version: field(raw.get("apiVersion")),
            kind: field(raw.get("kind")),
            name: field(raw.get("metadata").and_then(|m| m.get("name"))),
            raw,
        }
    }

    pub fn is_crd(&self) -> bool {
        self.api_version == CRD_API_VERSION && self.kind == CRD_KIND
    }

    pub fn to_crd(&self) -> anyhow::Result<CustomResourceDefinition> {
        serde_json::from_value(self.raw.clone())
            .with_context(|| format!("converting object {:?} to CRD", self.name))
    }
}

/// Parses every non-empty YAML document in `text`.
///
/// `source` names the manifest in error messages.
pub fn manifest_objects(text: &str, source: &str) -> anyhow::Result<Vec<ManifestObject>> {
    let mut out = Vec::new();
    for (idx, doc) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(doc)
            .with_context(|| format!("parsing {source} document {idx}"))?;
        match value {
            Value::Null => continue,
            Value::Object(_) => out.push(ManifestObject::from_value(value)),
            other => anyhow::bail!(
                "parsing {source} document {idx}: expected an object, got {}",
                json_type_name(&other)
            ),
        }
    }
    Ok(out)
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResourceDefinition {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: CrdSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdSpec {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub versions: Vec<CrdVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<CrdConversion>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdVersion {
    pub name: String,
    #[serde(default)]
    pub served: bool,
    #[serde(default)]
    pub storage: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdConversion {
    #[serde(default)]
    pub strategy: String,
}

impl CustomResourceDefinition {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn has_webhook_conversion(&self) -> bool {
        self.spec
            .conversion
            .as_ref()
            .is_some_and(|c| c.strategy == "Webhook")
    }

    pub fn stored_version(&self) -> Option<&str> {
        self.spec
            .versions
            .iter()
            .find(|v| v.storage)
            .map(|v| v.name.as_str())
    }
}
