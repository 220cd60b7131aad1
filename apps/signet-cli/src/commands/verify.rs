use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::Args;
use signet_core::toolchain::{run_captured, strip_node_warnings, CapturedOutput};
use signet_core::vcs::AUTO;
use signet_core::{publish_provider, Git, PackageRoot, Spec};
use tracing::debug;

use super::util::{require, Invocation};

const COMMAND: &str = "test";

#[derive(Args, Clone, Debug)]
pub struct VerifyArgs {
    /// Name of the provider service
    #[arg(long, short = 'n')]
    pub name: Option<String>,
    /// Version of the provider service; defaults to the git SHA of HEAD
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = AUTO)]
    pub version: Option<String>,
    /// Version control branch (optional)
    #[arg(long, short = 'b', num_args = 0..=1, default_missing_value = AUTO)]
    pub branch: Option<String>,
    /// URL where the provider service is running
    #[arg(long, short = 's')]
    pub provider_url: Option<String>,
}

/// Returns false when the provider failed verification.
pub fn execute(invocation: &Invocation, args: &VerifyArgs) -> Result<bool> {
    let cfg = invocation.config(COMMAND);
    let client = invocation.broker(COMMAND)?;
    let name = require("name", cfg.string("name", args.name.clone()))?;
    let git = Git::default();
    let version =
        git.resolve_version(&cfg.string("version", args.version.clone()).unwrap_or_default())?;
    let branch = cfg.string("branch", args.branch.clone()).unwrap_or_default();
    let provider_url = require(
        "provider-url",
        cfg.string("provider-url", args.provider_url.clone()),
    )?;

    let spec = Spec::from_broker_payload(&client.latest_spec(&name)?);
    let pkg = PackageRoot::discover()?;
    let spec_path = pkg.spec_file(spec.format());
    write_spec(&spec, &spec_path)?;

    let output = run_captured(
        Command::new("npx")
            .arg(pkg.dredd())
            .arg(&spec_path)
            .arg(&provider_url)
            .arg("--loglevel=error"),
    )?;
    debug!(code = ?output.code, "dredd finished");

    if !output.success {
        print!("{}", failure_report(&output)?);
        return Ok(false);
    }

    println!("PASS: Provider test passed - the provider service correctly implements the API spec");
    println!();
    println!("Informing the Signet broker of successful verification...");
    publish_provider(&client, &git, &spec_path, &name, &version, &branch)?;
    println!("Verification results published to Signet broker");
    Ok(true)
}

fn write_spec(spec: &Spec, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let doc = spec.to_document_bytes().context("encoding spec")?;
    fs::write(path, doc)
        .with_context(|| format!("Failed to write specs/spec file {}", path.display()))
}

/// Report for a failed verification; an empty transcript means dredd never ran.
fn failure_report(output: &CapturedOutput) -> Result<String> {
    if output.is_empty() {
        bail!("failed to execute dredd");
    }
    Ok(format!(
        "FAIL: Provider test failed - the provider service does not correctly implement the API spec\n\nBreakdown of interactions:\n{}\n",
        strip_node_warnings(&output.text)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn failure_report_strips_node_noise() {
        let output = CapturedOutput {
            success: false,
            code: Some(1),
            text: "fail: GET /orders\n(node:1) Warning: x\nto show where the warning was created)\n"
                .into(),
        };
        let report = failure_report(&output).unwrap();
        assert!(report.starts_with("FAIL: Provider test failed"));
        assert!(report.contains("Breakdown of interactions:\nfail: GET /orders\n"));
        assert!(!report.contains("(node:1)"));
    }

    #[test]
    fn silent_failure_means_dredd_did_not_run() {
        let output = CapturedOutput {
            success: false,
            code: None,
            text: String::new(),
        };
        assert_eq!(
            failure_report(&output).unwrap_err().to_string(),
            "failed to execute dredd"
        );
    }

    #[test]
    fn spec_is_written_where_dredd_reads_it() {
        let dir = tempdir().unwrap();
        let pkg = PackageRoot::new(dir.path());
        let spec = Spec::Json(json!({"openapi": "3.0.0"}));
        let path = pkg.spec_file(spec.format());
        write_spec(&spec, &path).unwrap();
        let written: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join("specs/spec.json")).unwrap()).unwrap();
        assert_eq!(written, json!({"openapi": "3.0.0"}));
    }
}
