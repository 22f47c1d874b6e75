//! Structured detail extraction from free-form failure prose.
//!
//! Each pattern pulls the semantically meaningful "from"/"to" values out of a
//! lower-cased failure description. Patterns are tried in [`PatternKind::ALL`]
//! order and the first match wins.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatternKind {
    TypeChange,
    DefaultChange,
    EnumTightened,
    ScopeChange,
    MinimumIncreased,
    MaximumDecreased,
    StoredVersionRemoved,
}

impl PatternKind {
    pub const ALL: [PatternKind; 7] = [
        PatternKind::TypeChange,
        PatternKind::DefaultChange,
        PatternKind::EnumTightened,
        PatternKind::ScopeChange,
        PatternKind::MinimumIncreased,
        PatternKind::MaximumDecreased,
        PatternKind::StoredVersionRemoved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::TypeChange => "type-change",
            PatternKind::DefaultChange => "default-change",
            PatternKind::EnumTightened => "enum-tightened",
            PatternKind::ScopeChange => "scope-change",
            PatternKind::MinimumIncreased => "minimum-increased",
            PatternKind::MaximumDecreased => "maximum-decreased",
            PatternKind::StoredVersionRemoved => "stored-version-removed",
        }
    }

    fn source(self) -> &'static str {
        match self {
            PatternKind::TypeChange => r"type changed from (\S+) to (\S+)",
            PatternKind::DefaultChange => r"default value changed from '([^']*)' to '([^']*)'",
            PatternKind::EnumTightened => {
                r"enum constraint tightened.* from \[([^\]]*)\] to \[([^\]]*)\]"
            }
            PatternKind::ScopeChange => r#"scope changed from "([^"]+)" to "([^"]+)""#,
            PatternKind::MinimumIncreased => r"minimum.* increased from ([^ ]+) to ([^ ]+)",
            PatternKind::MaximumDecreased => r"maximum.* decreased from ([^ ]+) to ([^ ]+)",
            PatternKind::StoredVersionRemoved => r#"stored version "?([^" ]+)"? removed"#,
        }
    }

    fn regex(self) -> Option<&'static Regex> {
        compiled()
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, re)| re)
    }
}

static COMPILED: OnceLock<Vec<(PatternKind, Regex)>> = OnceLock::new();

fn compiled() -> &'static [(PatternKind, Regex)] {
    COMPILED.get_or_init(|| {
        PatternKind::ALL
            .iter()
            .filter_map(|&kind| match Regex::new(kind.source()) {
                Ok(re) => Some((kind, re)),
                Err(err) => {
                    tracing::error!(pattern = kind.as_str(), %err, "invalid extraction pattern");
                    None
                }
            })
            .collect()
    })
}

/// The values captured by a matching pattern.
///
/// `to` is absent for patterns that only name the affected value (stored
/// version removal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction {
    pub kind: PatternKind,
    pub from: String,
    pub to: Option<String>,
}

impl Extraction {
    /// `from → to`, or just the captured value when there is no "to" side.
    pub fn arrow(&self) -> String {
        match &self.to {
            Some(to) => arrow(&self.from, to),
            None => self.from.clone(),
        }
    }
}

pub fn arrow(from: &str, to: &str) -> String {
    format!("{from} → {to}")
}

/// Tries a single pattern against `lowered`.
pub fn match_kind(kind: PatternKind, lowered: &str) -> Option<Extraction> {
    let caps = kind.regex()?.captures(lowered)?;
    let from = caps.get(1)?.as_str().to_string();
    let to = caps.get(2).map(|m| m.as_str().to_string());
    Some(Extraction { kind, from, to })
}

/// Returns the first pattern match in priority order.
pub fn extract(lowered: &str) -> Option<Extraction> {
    PatternKind::ALL
        .iter()
        .find_map(|&kind| match_kind(kind, lowered))
}
