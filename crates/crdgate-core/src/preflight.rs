//! Upgrade preflight: evaluates every CRD in a release against what is installed.

use std::fmt;

use anyhow::Context;
use thiserror::Error;

use crate::categorize::categorize;
use crate::config::RunnerConfig;
use crate::lookup::{CrdLookup, LookupError};
use crate::manifest::{manifest_objects, Release};
use crate::results::ValidationResults;
use crate::runner::{RecordedResults, ValidationRegistry};
use crate::summary::Summary;

/// A CRD whose upgrade was rejected, with the report explaining why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedCrd {
    pub name: String,
    pub summary: Summary,
}

impl fmt::Display for BlockedCrd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CRD {:?} upgrade blocked: {}", self.name, self.summary)
    }
}

/// Every blocked CRD of one release, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    blocked: Vec<BlockedCrd>,
}

impl Rejection {
    pub fn blocked(&self) -> &[BlockedCrd] {
        &self.blocked
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, b) in self.blocked.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{b}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Rejection {}

#[derive(Debug, Error)]
pub enum PreflightError {
    /// Manifest, conversion, lookup or runner failure; aborts the whole run.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),

    /// One or more CRDs carry critical or breaking issues.
    #[error(transparent)]
    Blocked(#[from] Rejection),
}

impl PreflightError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            PreflightError::Blocked(r) => Some(r),
            PreflightError::Fatal(_) => None,
        }
    }
}

/// Categorizes every failure in `results` into a fresh [`Summary`].
pub fn summarize(results: &ValidationResults) -> Summary {
    results
        .scoped_failures()
        .into_iter()
        .map(|failure| {
            let issue = categorize(&failure.raw, &failure.context);
            tracing::debug!(
                context = %failure.context,
                severity = %issue.severity,
                kind = issue.kind.label(),
                "categorized validation failure"
            );
            issue
        })
        .collect()
}

pub struct Preflight<L> {
    lookup: L,
    config: RunnerConfig,
    registry: Box<dyn ValidationRegistry + Send + Sync>,
}

impl<L: CrdLookup> Preflight<L> {
    /// Uses the default runner config and an empty recording (no failures).
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            config: RunnerConfig::default(),
            registry: Box::new(RecordedResults::new()),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: impl ValidationRegistry + Send + Sync + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn install(&self, release: Option<&Release>) -> Result<(), PreflightError> {
        self.evaluate(release)
    }

    pub fn upgrade(&self, release: Option<&Release>) -> Result<(), PreflightError> {
        self.evaluate(release)
    }

    pub fn evaluate(&self, release: Option<&Release>) -> Result<(), PreflightError> {
        let Some(release) = release else {
            return Ok(());
        };

        let source = format!("{}-release-manifest", release.name);
        let objects = manifest_objects(&release.manifest, &source)
            .with_context(|| format!("parsing release {:?} objects", release.name))?;

        let runner = self
            .registry
            .runner(&self.config)
            .context("creating CRD validation runner")?;

        let mut blocked = Vec::new();
        for obj in objects.iter().filter(|o| o.is_crd()) {
            let new_crd = obj.to_crd()?;
            let name = new_crd.name();

            let old_crd = match self.lookup.get(name) {
                Ok(crd) => {
                    tracing::debug!(crd = name, installed = true, "comparing against installed CRD");
                    crd
                }
                Err(LookupError::NotFound { .. }) => {
                    tracing::debug!(crd = name, installed = false, "no installed CRD; nothing to break");
                    continue;
                }
                Err(LookupError::Other(err)) => {
                    return Err(err
                        .context(format!("getting existing resource for CRD {name:?}"))
                        .into());
                }
            };

            let results = runner.run(&old_crd, &new_crd);
            if !results.has_failures() {
                tracing::info!(crd = name, "CRD upgrade allowed");
                continue;
            }

            let summary = summarize(&results);
            if !summary.is_blocking() {
                tracing::info!(crd = name, minor = summary.len(), "CRD upgrade allowed with minor issues");
                continue;
            }
            tracing::warn!(
                crd = name,
                critical = summary.critical_count(),
                breaking = summary.breaking_count(),
                "CRD upgrade blocked"
            );
            blocked.push(BlockedCrd {
                name: name.to_string(),
                summary,
            });
        }

        if blocked.is_empty() {
            Ok(())
        } else {
            Err(Rejection { blocked }.into())
        }
    }
}
