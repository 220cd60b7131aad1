use std::env;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use signet_core::{BrokerClient, CommandConfig, RcFile};
use tracing::debug;

/// Flags accepted by every command.
#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Scheme, domain and port of the Signet broker (e.g., http://localhost:3000); falls back to SIGNET_BROKER_URL
    #[arg(long, short = 'u', global = true)]
    pub broker_url: Option<String>,
    /// Ignore the .signetrc.yaml file if it exists
    #[arg(long, short = 'i', global = true)]
    pub ignore_config: bool,
}

/// Settings shared by one command invocation: global flags plus the config file.
pub(crate) struct Invocation {
    rc: Option<RcFile>,
    broker_url: Option<String>,
}

impl Invocation {
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let cwd = env::current_dir().context("resolving working directory")?;
        let rc = RcFile::discover(&cwd, global.ignore_config)?;
        debug!(config = rc.is_some(), "invocation settings loaded");
        Ok(Self {
            rc,
            broker_url: global.broker_url.clone(),
        })
    }

    pub(crate) fn config<'a>(&'a self, command: &'a str) -> CommandConfig<'a> {
        CommandConfig::new(self.rc.as_ref(), command)
    }

    /// Broker client for `command`; fails when no broker URL is configured.
    pub(crate) fn broker(&self, command: &str) -> Result<BrokerClient> {
        let url = require(
            "broker-url",
            self.config(command).broker_url(self.broker_url.clone()),
        )?;
        BrokerClient::new(&url).context("building HTTP client")
    }
}

/// Unwrap a required flag value, treating an empty string as missing.
pub(crate) fn require(flag: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("No --{flag} was provided. This is a required flag."))
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
}
