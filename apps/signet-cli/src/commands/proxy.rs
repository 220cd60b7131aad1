use std::future::Future;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use anyhow::{bail, Context, Result};
use clap::Args;
use signet_core::{create_pact, PackageRoot, WriteOutcome};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::util::{require, runtime, Invocation};

const COMMAND: &str = "proxy";
/// Read by the stub server's config template.
const PORT_ENV: &str = "SIGNET_PROXY_PORT";
const TARGET_ENV: &str = "SIGNET_PROXY_TARGET";

#[derive(Args, Clone, Debug)]
pub struct ProxyArgs {
    /// Relative path and filename the consumer contract will be written to
    #[arg(long, short = 'p')]
    pub path: Option<String>,
    /// Port the Signet proxy should listen on
    #[arg(long = "port", short = 'o')]
    pub port: Option<String>,
    /// URL of the running provider stub or mock
    #[arg(long, short = 't')]
    pub target: Option<String>,
    /// Canonical name of the consumer service
    #[arg(long, short = 'n')]
    pub name: Option<String>,
    /// Canonical name of the provider service the stub or mock represents
    #[arg(long, short = 'm')]
    pub provider_name: Option<String>,
}

/// Validated proxy settings.
#[derive(Debug, Clone)]
struct ProxySettings {
    path: String,
    port: u16,
    target: String,
    consumer: String,
    provider: String,
}

fn settings(invocation: &Invocation, args: &ProxyArgs) -> Result<ProxySettings> {
    let cfg = invocation.config(COMMAND);
    let path = require("path", cfg.string("path", args.path.clone()))?;
    let port = require("port", cfg.string("port", args.port.clone()))?;
    let target = require("target", cfg.string("target", args.target.clone()))?;
    let consumer = require("name", cfg.string("name", args.name.clone()))?;
    let provider = require(
        "provider-name",
        cfg.string("provider-name", args.provider_name.clone()),
    )?;
    let port = port
        .parse::<u16>()
        .with_context(|| format!("--port must be a port number, got {port}"))?;
    Ok(ProxySettings {
        path,
        port,
        target,
        consumer,
        provider,
    })
}

pub fn execute(invocation: &Invocation, args: &ProxyArgs) -> Result<()> {
    let settings = settings(invocation, args)?;
    let pkg = PackageRoot::discover()?;
    runtime()?.block_on(run_proxy(&pkg, &settings))
}

async fn run_proxy(pkg: &PackageRoot, settings: &ProxySettings) -> Result<()> {
    let mut child = Command::new("npx")
        .arg(pkg.mountebank())
        .arg("--configfile")
        .arg(pkg.mountebank_config())
        .arg("--datadir")
        .arg(pkg.mountebank_data())
        .arg("--debug")
        .arg("--nologfile")
        .env(PORT_ENV, settings.port.to_string())
        .env(TARGET_ENV, &settings.target)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .context("failed to start mountebank")?;

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        forwarders.push(tokio::spawn(forward_lines(stdout)));
    }
    if let Some(stderr) = child.stderr.take() {
        forwarders.push(tokio::spawn(forward_lines(stderr)));
    }

    println!(
        "Listening - Signet proxy is listening on port {} and will proxy messages for {}",
        settings.port, settings.target
    );
    println!("\nHit Ctrl + C to stop");

    if let Stop::Exited(status) = wait_for_stop(tokio::signal::ctrl_c(), child.wait()).await? {
        drain(forwarders).await;
        bail!("stub server exited early ({status})");
    }

    println!("\n\ngenerating consumer contract...");
    let dest = Path::new(&settings.path);
    let outcome = create_pact(
        &pkg.stubs_dir(settings.port),
        dest,
        &settings.consumer,
        &settings.provider,
    );

    if let Err(err) = child.kill().await {
        debug!(error = %err, "stub server already stopped");
    }
    drain(forwarders).await;

    match outcome.context("generating consumer contract")? {
        WriteOutcome::Written => println!(
            "\nSuccess - Signet proxy wrote the consumer contract to {}",
            dest.display()
        ),
        WriteOutcome::NoInteractions => println!(
            "\nInfo - No contract was generated because Signet proxy did not record any interactions"
        ),
    }
    Ok(())
}

/// How a proxy session ended.
#[derive(Debug)]
enum Stop {
    Interrupted,
    Exited(ExitStatus),
}

/// Ctrl-C also reaches the stub server, so both can be ready at once; the
/// interrupt wins.
async fn wait_for_stop<I, W>(interrupt: I, exited: W) -> Result<Stop>
where
    I: Future<Output = io::Result<()>>,
    W: Future<Output = io::Result<ExitStatus>>,
{
    tokio::select! {
        biased;
        signal = interrupt => {
            signal.context("listening for Ctrl-C")?;
            Ok(Stop::Interrupted)
        }
        status = exited => Ok(Stop::Exited(status.context("waiting for stub server")?)),
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => println!("{line}"),
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "stopped reading stub server output");
                break;
            }
        }
    }
}

async fn drain(forwarders: Vec<JoinHandle<()>>) {
    for handle in forwarders {
        if let Err(err) = handle.await {
            warn!(error = %err, "output forwarder failed");
        }
    }
}
