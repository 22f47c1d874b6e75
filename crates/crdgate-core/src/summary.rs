//! Ordered issue log for one CRD evaluation and its rendered report.

use std::fmt;

use crdgate_contracts::CHECK_NAME;

use crate::categorize::CategorizedIssue;
use crate::severity::Severity;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    severity: Severity,
    text: String,
}

/// Insertion-ordered log of categorized issues.
///
/// Tier counts are folded from the log, so they always equal the number of
/// issues added at each tier. Minor issues are listed but never counted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    check_name: String,
    entries: Vec<Entry>,
}

impl Default for Summary {
    fn default() -> Self {
        Self::new()
    }
}

impl Summary {
    pub fn new() -> Self {
        Self::with_check_name(CHECK_NAME)
    }

    pub fn with_check_name(check_name: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            entries: Vec::new(),
        }
    }

    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    fn push(&mut self, severity: Severity, text: impl Into<String>) {
        self.entries.push(Entry {
            severity,
            text: text.into(),
        });
    }

    pub fn add_critical_issue(&mut self, issue: impl Into<String>) {
        self.push(Severity::Critical, issue);
    }

    pub fn add_breaking_issue(&mut self, issue: impl Into<String>) {
        self.push(Severity::Breaking, issue);
    }

    /// Records a non-blocking issue: listed in the report, not counted.
    pub fn add_issue(&mut self, issue: impl Into<String>) {
        self.push(Severity::Minor, issue);
    }

    pub fn add(&mut self, issue: CategorizedIssue) {
        self.push(issue.severity, issue.message);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    pub fn critical_count(&self) -> usize {
        self.count(Severity::Critical)
    }

    pub fn breaking_count(&self) -> usize {
        self.count(Severity::Breaking)
    }

    /// Critical plus breaking; this is the pass/fail total.
    pub fn total(&self) -> usize {
        self.critical_count() + self.breaking_count()
    }

    pub fn is_blocking(&self) -> bool {
        self.total() > 0
    }

    pub fn issues(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        let total = self.total();
        if total == 0 {
            return format!("{}\nTotal: 0\nIssues: none", self.check_name);
        }

        let mut parts = Vec::new();
        let critical = self.critical_count();
        if critical > 0 {
            parts.push(format!("{critical} critical"));
        }
        let breaking = self.breaking_count();
        if breaking > 0 {
            parts.push(format!("{breaking} breaking"));
        }

        let mut out = format!(
            "{}\nTotal: {total} ({})\nIssues:",
            self.check_name,
            parts.join(", ")
        );
        for entry in &self.entries {
            out.push_str("\n- ");
            out.push_str(&entry.text);
        }
        out
    }
}

impl FromIterator<CategorizedIssue> for Summary {
    fn from_iter<I: IntoIterator<Item = CategorizedIssue>>(iter: I) -> Self {
        let mut summary = Summary::new();
        summary.extend(iter);
        summary
    }
}

impl Extend<CategorizedIssue> for Summary {
    fn extend<I: IntoIterator<Item = CategorizedIssue>>(&mut self, iter: I) {
        for issue in iter {
            self.add(issue);
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
