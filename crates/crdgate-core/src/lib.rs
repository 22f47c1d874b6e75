//! Upgrade-safety gate for CustomResourceDefinitions.
//!
//! Raw failures from a schema-diff runner are classified into severity tiers,
//! rendered as actionable messages, and folded into one pass/fail decision per
//! CRD. [`Preflight`] walks a release manifest and joins the per-CRD decisions.

pub mod categorize;
pub mod config;
pub mod lookup;
pub mod manifest;
pub mod pattern;
pub mod preflight;
pub mod results;
pub mod runner;
pub mod severity;
pub mod summary;

pub use categorize::{categorize, CategorizedIssue, IssueKind};
pub use config::{ConversionPolicy, EnforcementPolicy, RunnerConfig, ValidationConfig};
pub use lookup::{CrdLookup, DirectoryLookup, LookupError};
pub use manifest::{manifest_objects, CustomResourceDefinition, ManifestObject, Release};
pub use preflight::{summarize, BlockedCrd, Preflight, PreflightError, Rejection};
pub use results::{CheckResult, ScopedFailure, ValidationResults};
pub use runner::{RecordedResults, ValidationRegistry, ValidationRunner};
pub use severity::{severity, Severity};
pub use summary::Summary;
