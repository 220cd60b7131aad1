use anyhow::Result;
use clap::Args;
use signet_core::vcs::AUTO;
use signet_core::{build_deployment_request, Git};

use super::util::{require, Invocation};

const COMMAND: &str = "update-deployment";

#[derive(Args, Clone, Debug)]
pub struct UpdateDeploymentArgs {
    /// Name of the service which was deployed
    #[arg(long, short = 'n')]
    pub name: Option<String>,
    /// Version of the service which was deployed; defaults to the git SHA of HEAD
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = AUTO)]
    pub version: Option<String>,
    /// Environment the service was deployed to
    #[arg(long, short = 'e')]
    pub environment: Option<String>,
    /// The service is no longer deployed to the environment
    #[arg(long, short = 'd')]
    pub delete: bool,
}

pub fn execute(invocation: &Invocation, args: &UpdateDeploymentArgs) -> Result<()> {
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
    let deployed = !cfg.switch("delete", args.delete);

    let body = build_deployment_request(&environment, &name, &version, deployed)?;
    client.update_deployment(body)?;

    if deployed {
        println!("Deployed - Signet broker was notified that version {version} of {name} has been deployed to the {environment} environment");
    } else {
        println!("Undeployed - Signet broker was notified that version {version} of {name} is no longer deployed to the {environment} environment");
    }
    Ok(())
}
