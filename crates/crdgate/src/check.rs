use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use crdgate_contracts::CHECK_REPORT_SCHEMA_VERSION;
use crdgate_core::{
    ConversionPolicy, DirectoryLookup, EnforcementPolicy, Preflight, PreflightError,
    RecordedResults, Release, RunnerConfig,
};
use serde::Serialize;

use crate::util;

pub const EXIT_BLOCKED: u8 = 1;
pub const EXIT_FATAL: u8 = 2;

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Release manifest (multi-document YAML) proposed for install/upgrade.
    #[arg(long, value_name = "PATH")]
    pub manifest: PathBuf,

    /// Directory of currently installed CRD manifests (YAML/JSON, searched recursively).
    #[arg(long, value_name = "DIR")]
    pub installed: PathBuf,

    /// Recorded validation results (crdgate.recorded-results JSON). Omit for none.
    #[arg(long, value_name = "PATH")]
    pub results: Option<PathBuf>,

    /// Release name used in messages. Defaults to the manifest file stem.
    #[arg(long, value_name = "NAME")]
    pub release: Option<String>,

    /// Runner config JSON. Defaults to the strict built-in policy.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the enforcement for checks not listed in the config.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub unhandled_enforcement: Option<EnforcementPolicy>,

    /// Override the served-version conversion policy.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub conversion: Option<ConversionPolicy>,

    /// Print a JSON report on stdout instead of text.
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON report to this path.
    #[arg(long, value_name = "PATH")]
    pub report_out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    schema_version: &'static str,
    ok: bool,
    release: String,
    manifest_sha256: String,
    blocked: Vec<BlockedEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct BlockedEntry {
    crd: String,
    critical: usize,
    breaking: usize,
    summary: String,
}

fn release_name(args: &CheckArgs) -> String {
    if let Some(name) = &args.release {
        return name.clone();
    }
    args.manifest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "release".to_string())
}

fn load_config(args: &CheckArgs) -> Result<RunnerConfig> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::from_json_file(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(policy) = args.unhandled_enforcement {
        config.unhandled_enforcement = policy;
    }
    if let Some(policy) = args.conversion {
        config.conversion = policy;
    }
    Ok(config)
}

pub fn cmd_check(args: CheckArgs) -> Result<ExitCode> {
    let manifest = std::fs::read_to_string(&args.manifest)
        .with_context(|| format!("read manifest: {}", args.manifest.display()))?;
    let release = Release::new(release_name(&args), manifest);
    let config = load_config(&args)?;
    let recorded = match &args.results {
        Some(path) => RecordedResults::from_json_file(path)?,
        None => RecordedResults::new(),
    };
    let lookup = DirectoryLookup::load(&args.installed)?;
    tracing::debug!(
        release = %release.name,
        installed = lookup.len(),
        recorded = recorded.crds.len(),
        "running CRD upgrade preflight"
    );

    let preflight = Preflight::new(lookup)
        .with_config(config)
        .with_registry(recorded);
    let outcome = preflight.upgrade(Some(&release));

    let mut report = CheckReport {
        schema_version: CHECK_REPORT_SCHEMA_VERSION,
        ok: outcome.is_ok(),
        release: release.name.clone(),
        manifest_sha256: util::manifest_digest(&release.manifest),
        blocked: Vec::new(),
        error: None,
    };
    let exit_code = match &outcome {
        Ok(()) => 0,
        Err(PreflightError::Blocked(rejection)) => {
            report.blocked = rejection
                .blocked()
                .iter()
                .map(|b| BlockedEntry {
                    crd: b.name.clone(),
                    critical: b.summary.critical_count(),
                    breaking: b.summary.breaking_count(),
                    summary: b.summary.render(),
                })
                .collect();
            EXIT_BLOCKED
        }
        Err(PreflightError::Fatal(err)) => {
            report.error = Some(format!("{err:#}"));
            EXIT_FATAL
        }
    };

    if let Some(out) = &args.report_out {
        util::write_report(out, &report)?;
    }

    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        match &outcome {
            Ok(()) => println!("release {:?}: CRD upgrade allowed", report.release),
            Err(PreflightError::Blocked(rejection)) => eprintln!("{rejection}"),
            Err(PreflightError::Fatal(err)) => eprintln!("{err:#}"),
        }
    }

    Ok(ExitCode::from(exit_code))
}
