//! Turns raw validation failures into actionable, tier-tagged messages.
//!
//! [`RULES`] is the single ordered classification table. Structured patterns
//! come first (most specific), followed by keyword rules in tier order, and a
//! generic fallback that always applies. The first matching rule decides both
//! the label and the severity of the issue.

use std::fmt;

use serde::Serialize;

use crate::pattern::{self, Extraction, PatternKind};
use crate::severity::Severity;

const NOT_BACKWARDS_COMPATIBLE: &str =
    "The OLM preflight blocked our CRD update because it isn't backwards-compatible.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    VersionOrScope,
    RequiredFieldAdded,
    FieldRemoved,
    TypeChanged,
    EnumTightened,
    EnumRestrictionAdded,
    DefaultChanged,
    DefaultAdded,
    DefaultRemoved,
    MinimumIncreased,
    MaximumDecreased,
    ConstraintTightened,
    ConstraintAdded,
    Generic,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            IssueKind::VersionOrScope => "Version removal/scope change",
            IssueKind::RequiredFieldAdded => "Required field added",
            IssueKind::FieldRemoved => "Field removal detected",
            IssueKind::TypeChanged => "Type changed",
            IssueKind::EnumTightened => "Enum restriction tightened",
            IssueKind::EnumRestrictionAdded => "Enum restriction added",
            IssueKind::DefaultChanged => "Default changed",
            IssueKind::DefaultAdded => "Default added",
            IssueKind::DefaultRemoved => "Default removed",
            IssueKind::MinimumIncreased => "Minimum increased",
            IssueKind::MaximumDecreased => "Maximum decreased",
            IssueKind::ConstraintTightened => "Constraint tightened",
            IssueKind::ConstraintAdded => "Constraint added",
            IssueKind::Generic => "Backwards-compatibility issue",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            IssueKind::VersionOrScope | IssueKind::RequiredFieldAdded | IssueKind::FieldRemoved => {
                Severity::Critical
            }
            IssueKind::TypeChanged
            | IssueKind::EnumTightened
            | IssueKind::EnumRestrictionAdded
            | IssueKind::DefaultChanged
            | IssueKind::DefaultAdded
            | IssueKind::DefaultRemoved
            | IssueKind::MinimumIncreased
            | IssueKind::MaximumDecreased
            | IssueKind::ConstraintTightened
            | IssueKind::ConstraintAdded => Severity::Breaking,
            IssueKind::Generic => Severity::Minor,
        }
    }

    /// Remediation sentence appended after any extracted detail.
    fn remediation(self) -> Option<&'static str> {
        match self {
            IssueKind::VersionOrScope => None,
            IssueKind::RequiredFieldAdded => Some(
                "Make the new field optional or provide a default. Required-field additions break existing CRs and are rejected by OLM's safety check.",
            ),
            IssueKind::FieldRemoved => Some(
                "The OLM preflight blocked our CRD update because it isn't backwards-compatible. Please rework the change to be additive: avoid removing fields.",
            ),
            IssueKind::TypeChanged => Some(
                "The OLM preflight blocked our CRD update because it isn't backwards-compatible. Don't change types in place - add a new CRD version instead.",
            ),
            IssueKind::EnumTightened => {
                Some("Avoid narrowing enums; only additive relaxations are allowed.")
            }
            IssueKind::EnumRestrictionAdded => {
                Some("Avoid adding new enum restrictions or removing existing enum values.")
            }
            IssueKind::DefaultChanged => Some(
                "Keep the old default, or introduce the new behavior via a new field or version.",
            ),
            IssueKind::DefaultAdded => Some(
                "Adding a new default may change existing behavior. Prefer introducing a new field or version.",
            ),
            IssueKind::DefaultRemoved => Some(
                "Removing a default may break existing behavior. Keep the existing default or introduce a new field.",
            ),
            IssueKind::MinimumIncreased => {
                Some("Increasing minimums is prohibited; only decreases are allowed.")
            }
            IssueKind::MaximumDecreased => {
                Some("Decreasing maximums is prohibited; only increases are allowed.")
            }
            IssueKind::ConstraintTightened => Some(
                "Tightening min/max, length or item bounds is prohibited; only relaxations are allowed.",
            ),
            IssueKind::ConstraintAdded => Some(
                "Adding min/max constraints to previously unconstrained fields is prohibited.",
            ),
            IssueKind::Generic => Some(
                "The OLM preflight blocked our CRD update because it isn't backwards-compatible. Please rework the change to be additive: avoid removing or tightening fields, don't change types in place, and keep defaults stable.",
            ),
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy)]
enum Matcher {
    Pattern(PatternKind),
    Keywords(fn(&str) -> bool),
    Always,
}

#[derive(Clone, Copy)]
struct Rule {
    kind: IssueKind,
    matcher: Matcher,
    /// Fixed detail used when the rule carries no extracted values.
    note: Option<&'static str>,
}

const fn pattern(kind: IssueKind, p: PatternKind) -> Rule {
    Rule {
        kind,
        matcher: Matcher::Pattern(p),
        note: None,
    }
}

const fn keywords(kind: IssueKind, f: fn(&str) -> bool, note: Option<&'static str>) -> Rule {
    Rule {
        kind,
        matcher: Matcher::Keywords(f),
        note,
    }
}

static RULES: &[Rule] = &[
    pattern(IssueKind::TypeChanged, PatternKind::TypeChange),
    pattern(IssueKind::DefaultChanged, PatternKind::DefaultChange),
    pattern(IssueKind::EnumTightened, PatternKind::EnumTightened),
    pattern(IssueKind::VersionOrScope, PatternKind::ScopeChange),
    pattern(IssueKind::MinimumIncreased, PatternKind::MinimumIncreased),
    pattern(IssueKind::MaximumDecreased, PatternKind::MaximumDecreased),
    pattern(IssueKind::VersionOrScope, PatternKind::StoredVersionRemoved),
    // critical
    keywords(
        IssueKind::VersionOrScope,
        version_removed,
        Some("stored/served version removed"),
    ),
    keywords(IssueKind::VersionOrScope, scope_changed, Some("scope changed")),
    keywords(IssueKind::RequiredFieldAdded, required_added, None),
    keywords(IssueKind::FieldRemoved, field_removed, None),
    // breaking
    keywords(IssueKind::TypeChanged, type_changed, None),
    keywords(IssueKind::EnumTightened, enum_tightened, None),
    keywords(IssueKind::EnumRestrictionAdded, enum_restricted, None),
    keywords(IssueKind::DefaultAdded, default_added, None),
    keywords(IssueKind::DefaultRemoved, default_removed, None),
    keywords(
        IssueKind::DefaultChanged,
        default_changed,
        Some("Changing defaults is flagged by the preflight"),
    ),
    keywords(IssueKind::ConstraintTightened, bound_tightened, None),
    keywords(IssueKind::ConstraintAdded, bound_added, None),
    // any removal not claimed above is treated as a field removal
    keywords(IssueKind::FieldRemoved, any_removal, None),
    Rule {
        kind: IssueKind::Generic,
        matcher: Matcher::Always,
        note: None,
    },
];

fn version_removed(l: &str) -> bool {
    (l.contains("stored version") || l.contains("served version")) && l.contains("removed")
}

fn scope_changed(l: &str) -> bool {
    l.contains("scope changed")
}

fn required_added(l: &str) -> bool {
    l.contains("required") && (l.contains("added") || l.contains("new"))
}

fn field_removed(l: &str) -> bool {
    (l.contains("existing field") && (l.contains("removed") || l.contains("removal")))
        || l.contains("field removed")
        || l.contains("field removal")
        || l.contains("removed field")
}

fn type_changed(l: &str) -> bool {
    l.contains("type") && (l.contains("changed") || l.contains("differ"))
}

fn enum_tightened(l: &str) -> bool {
    l.contains("enum")
        && (l.contains("tightened") || l.contains("restricted") || l.contains("narrowed"))
}

fn enum_restricted(l: &str) -> bool {
    l.contains("enum") && (l.contains("removed") || l.contains("restriction added"))
}

fn default_added(l: &str) -> bool {
    l.contains("default") && l.contains("added")
}

fn default_removed(l: &str) -> bool {
    l.contains("default") && l.contains("removed")
}

fn default_changed(l: &str) -> bool {
    l.contains("default") && l.contains("changed")
}

fn mentions_bound(l: &str) -> bool {
    [
        "minimum",
        "maximum",
        "minlength",
        "maxlength",
        "minitems",
        "maxitems",
        "minproperties",
        "maxproperties",
    ]
    .iter()
    .any(|k| l.contains(k))
}

fn bound_tightened(l: &str) -> bool {
    mentions_bound(l) && (l.contains("increased") || l.contains("decreased"))
}

fn bound_added(l: &str) -> bool {
    mentions_bound(l) && l.contains("added")
}

fn any_removal(l: &str) -> bool {
    l.contains("removed") || l.contains("removal")
}

/// Which rule matched a failure and what it extracted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub kind: IssueKind,
    pub detail: Option<String>,
}

fn extraction_detail(ex: &Extraction) -> String {
    match ex.kind {
        PatternKind::StoredVersionRemoved => format!("stored version removed ({})", ex.from),
        PatternKind::ScopeChange => format!("scope {}", ex.arrow()),
        _ => ex.arrow(),
    }
}

/// Walks the rule table for `raw` (case-insensitively).
pub fn classify(raw: &str) -> Classification {
    let lowered = raw.to_lowercase();
    for rule in RULES {
        let detail = match rule.matcher {
            Matcher::Pattern(p) => match pattern::match_kind(p, &lowered) {
                Some(ex) => Some(extraction_detail(&ex)),
                None => continue,
            },
            Matcher::Keywords(f) if f(&lowered) => rule.note.map(str::to_string),
            Matcher::Keywords(_) => continue,
            Matcher::Always => rule.note.map(str::to_string),
        };
        return Classification {
            kind: rule.kind,
            detail,
        };
    }
    Classification {
        kind: IssueKind::Generic,
        detail: None,
    }
}

/// A rendered issue together with the tier it was classified into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategorizedIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
}

impl CategorizedIssue {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for CategorizedIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Categorizes a raw failure found at `context`.
///
/// Never fails: unrecognized failures degrade to the generic minor message.
pub fn categorize(raw: &str, context: &str) -> CategorizedIssue {
    let Classification { kind, detail } = classify(raw);
    let body = match (detail, kind.remediation()) {
        (Some(detail), Some(fix)) => format!("{detail}. {fix}"),
        (Some(detail), None) => detail,
        (None, Some(fix)) => fix.to_string(),
        (None, None) => NOT_BACKWARDS_COMPATIBLE.to_string(),
    };
    CategorizedIssue {
        kind,
        severity: kind.severity(),
        message: format!("{} ({context}): {body}", kind.label()),
    }
}
