use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use crdgate_core::categorize;
use serde::Serialize;

#[derive(Debug, Clone, Args)]
pub struct CategorizeArgs {
    /// Location the failures were reported at (version, property path, or check name).
    #[arg(long, value_name = "CTX", default_value = "crd")]
    pub context: String,

    /// Print one JSON object per failure instead of tab-separated text.
    #[arg(long)]
    pub json: bool,

    /// Raw failure descriptions, as emitted by the schema-diff runner.
    #[arg(value_name = "FAILURE", required = true)]
    pub failures: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CategorizedLine<'a> {
    failure: &'a str,
    #[serde(flatten)]
    issue: crdgate_core::CategorizedIssue,
}

pub fn cmd_categorize(args: CategorizeArgs) -> Result<ExitCode> {
    for failure in &args.failures {
        let issue = categorize(failure, &args.context);
        if args.json {
            println!(
                "{}",
                serde_json::to_string(&CategorizedLine { failure, issue })?
            );
        } else {
            println!("{}\t{}", issue.severity, issue.message);
        }
    }
    Ok(ExitCode::SUCCESS)
}
