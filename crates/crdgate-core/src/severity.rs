//! Severity tiers for detected incompatibilities.
//!
//! Tiers are ordered for reporting: critical first, then breaking, then minor.
//! Only critical and breaking issues count toward the pass/fail total.

use std::fmt;

use serde::Serialize;

use crate::categorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Breaking,
    Minor,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Breaking => "breaking",
            Severity::Minor => "minor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "critical" => Some(Severity::Critical),
            "breaking" => Some(Severity::Breaking),
            "minor" => Some(Severity::Minor),
            _ => None,
        }
    }

    /// True if issues of this tier block the upgrade.
    pub fn is_blocking(self) -> bool {
        matches!(self, Severity::Critical | Severity::Breaking)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a raw failure description.
///
/// The tier is the one carried by the first matching categorization rule, so a
/// failure's severity and its rendered label can never disagree.
pub fn severity(raw: &str) -> Severity {
    categorize::classify(raw).kind.severity()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_tier() {
        for &s in &[Severity::Critical, Severity::Breaking, Severity::Minor] {
            assert_eq!(Severity::parse(s.as_str()), Some(s));
        }
        assert_eq!(Severity::parse("fatal"), None);
    }

    #[test]
    fn only_critical_and_breaking_block() {
        assert!(Severity::Critical.is_blocking());
        assert!(Severity::Breaking.is_blocking());
        assert!(!Severity::Minor.is_blocking());
    }

    #[test]
    fn critical_failures() {
        for raw in [
            "existing field 'spec.route' removed from schema",
            "required field 'spec.mandatory' added to schema",
            "stored version v1alpha1 removed",
            "served version v1beta1 removed",
            "scope changed from \"Namespaced\" to \"Cluster\"",
        ] {
            assert_eq!(severity(raw), Severity::Critical, "{raw}");
        }
    }

    #[test]
    fn breaking_failures() {
        for raw in [
            "field type changed from string to integer",
            "enum constraint tightened from [a,b,c] to [a,b]",
            "default value changed from false to true",
            "default value added",
            "minimum value of spec.replicas increased from 1 to 3",
            "maxItems constraint added",
        ] {
            assert_eq!(severity(raw), Severity::Breaking, "{raw}");
        }
    }

    #[test]
    fn minor_failures() {
        assert_eq!(severity("field description updated"), Severity::Minor);
        assert_eq!(severity("some other validation issue"), Severity::Minor);
    }

    #[test]
    fn severity_ignores_case() {
        assert_eq!(
            severity("Existing Field 'spec.x' REMOVED"),
            Severity::Critical
        );
        assert_eq!(
            severity("existing field 'spec.x' removed"),
            severity("existing field 'spec.x' removed")
        );
    }
}
