use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use signet_core::vcs::AUTO;
use signet_core::{publish_consumer, publish_provider, Git, Role};

use super::util::{require, Invocation};

const COMMAND: &str = "publish";

#[derive(Args, Clone, Debug)]
pub struct PublishArgs {
    /// Type of contract ("consumer" or "provider")
    #[arg(long = "type", short = 't')]
    pub kind: Option<String>,
    /// Path to the consumer contract or provider spec
    #[arg(long, short = 'p')]
    pub path: Option<String>,
    /// Version of the service; defaults to the git SHA of HEAD for consumers
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = AUTO)]
    pub version: Option<String>,
    /// Version control branch (optional)
    #[arg(long, short = 'b', num_args = 0..=1, default_missing_value = AUTO)]
    pub branch: Option<String>,
    /// Name of the provider service (required if --type is "provider")
    #[arg(long, short = 'n')]
    pub provider_name: Option<String>,
}

fn parse_role(kind: &str) -> Result<Role> {
    match kind {
        "consumer" => Ok(Role::Consumer),
        "provider" => Ok(Role::Provider),
        "" => bail!("--type required to be \"consumer\" or \"provider\", --type was not set"),
        other => bail!("--type required to be \"consumer\" or \"provider\", --type was {other}"),
    }
}

pub fn execute(invocation: &Invocation, args: &PublishArgs) -> Result<()> {
    let cfg = invocation.config(COMMAND);
    let role = parse_role(&cfg.string("type", args.kind.clone()).unwrap_or_default())?;
    let path = require("path", cfg.string("path", args.path.clone()))?;
    let client = invocation.broker(COMMAND)?;
    let version = cfg.string("version", args.version.clone()).unwrap_or_default();
    let branch = cfg.string("branch", args.branch.clone()).unwrap_or_default();
    let git = Git::default();

    match role {
        Role::Consumer => {
            publish_consumer(&client, &git, Path::new(&path), &version, &branch)?;
        }
        Role::Provider => {
            let provider_name = cfg
                .string("provider-name", args.provider_name.clone())
                .unwrap_or_default();
            publish_provider(
                &client,
                &git,
                Path::new(&path),
                &provider_name,
                &version,
                &branch,
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_must_be_consumer_or_provider() {
        assert_eq!(parse_role("consumer").unwrap(), Role::Consumer);
        assert_eq!(parse_role("provider").unwrap(), Role::Provider);
        assert_eq!(
            parse_role("").unwrap_err().to_string(),
            "--type required to be \"consumer\" or \"provider\", --type was not set"
        );
        assert!(parse_role("pact")
            .unwrap_err()
            .to_string()
            .ends_with("--type was pact"));
    }
}
