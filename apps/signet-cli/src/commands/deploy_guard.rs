use anyhow::Result;
use clap::Args;
use signet_core::vcs::AUTO;
use signet_core::{DeployGuardResponse, Git};

use super::util::{require, Invocation};

const COMMAND: &str = "deploy-guard";

#[derive(Args, Clone, Debug)]
pub struct DeployGuardArgs {
    /// Name of the service
    #[arg(long, short = 'n')]
    pub name: Option<String>,
    /// Version of the service; defaults to the git SHA of HEAD
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = AUTO)]
    pub version: Option<String>,
    /// Environment the service would be deployed to (e.g., production)
    #[arg(long, short = 'e')]
    pub environment: Option<String>,
}

/// Returns false when the broker reports the deployment as unsafe.
pub fn execute(invocation: &Invocation, args: &DeployGuardArgs) -> Result<bool> {
    let cfg = invocation.config(COMMAND);
    let client = invocation.broker(COMMAND)?;
    let name = require("name", cfg.string("name", args.name.clone()))?;
    let version = Git::default().resolve_version(
        &cfg.string("version", args.version.clone()).unwrap_or_default(),
    )?;
    let environment = require(
        "environment",
        cfg.string("environment", args.environment.clone()),
    )?;

    let report = client.deploy_guard(&name, &version, &environment)?;
    if report.status {
        println!("Safe To Deploy - version {version} of {name} is compatible with all other services in {environment} environment");
    } else {
        eprint!("{}", unsafe_report(&report, &name, &version, &environment));
    }
    Ok(report.status)
}

fn unsafe_report(
    report: &DeployGuardResponse,
    name: &str,
    version: &str,
    environment: &str,
) -> String {
    let mut text = format!("Unsafe to Deploy - version {version} of {name} is incompatible with one or more services in {environment} environment\n");
    for err in &report.errors {
        text.push_str(&format!("  {}: {}\n", err.title, err.details));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use signet_core::DeployGuardError;

    #[test]
    fn unsafe_report_lists_broker_errors() {
        let report = DeployGuardResponse {
            status: false,
            errors: vec![DeployGuardError {
                title: "incompatible consumer".into(),
                details: "frontend expects GET /orders".into(),
            }],
        };
        let text = unsafe_report(&report, "orders", "v2", "production");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Unsafe to Deploy - version v2 of orders"));
        assert_eq!(lines[1], "  incompatible consumer: frontend expects GET /orders");
    }
}
