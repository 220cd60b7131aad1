use anyhow::Result;
use clap::Args;
use signet_core::build_environment_request;

use super::util::{require, Invocation};

const COMMAND: &str = "register-env";

#[derive(Args, Clone, Debug)]
pub struct RegisterEnvArgs {
    /// Name of the deployment environment being registered
    #[arg(long, short = 'e')]
    pub environment: Option<String>,
}

pub fn execute(invocation: &Invocation, args: &RegisterEnvArgs) -> Result<()> {
    let cfg = invocation.config(COMMAND);
    let client = invocation.broker(COMMAND)?;
    let environment = require(
        "environment",
        cfg.string("environment", args.environment.clone()),
    )?;
    client.register_environment(build_environment_request(&environment)?)?;
    Ok(())
}
