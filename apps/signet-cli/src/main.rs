mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::util::Invocation;
use commands::{
    deploy, deploy_guard, proxy, publish, register_env, update_deployment, verify,
    DeployGuardArgs, GlobalArgs, ProxyArgs, PublishArgs, RegisterEnvArgs, UpdateDeploymentArgs,
    VerifyArgs,
};

const ABOUT: &str = "A command line interface for the contract broker";

#[derive(Parser)]
#[command(name = "signet", version, about = ABOUT)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a consumer contract or provider spec to the Signet broker
    Publish(PublishArgs),
    /// Register a deployment environment with the broker
    RegisterEnv(RegisterEnvArgs),
    /// Notify the broker that a service version was deployed to (or removed from) an environment
    UpdateDeployment(UpdateDeploymentArgs),
    /// Check if it is safe to deploy a service version to an environment
    DeployGuard(DeployGuardArgs),
    /// Test that a provider version correctly implements its published API spec
    Test(VerifyArgs),
    /// Record traffic to a provider stub and generate a consumer contract
    Proxy(ProxyArgs),
    /// Deploy the Signet broker to your AWS account on ECS with Fargate
    Deploy,
    /// Tear down the Signet broker deployment on AWS
    Undeploy,
}

fn main() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("{ABOUT}\n");
        let _ = Cli::command().print_help();
        return;
    };

    match run(&cli.global, command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}

/// Ok(false) asks for a non-zero exit without an error message.
fn run(global: &GlobalArgs, command: Commands) -> Result<bool> {
    let invocation = Invocation::load(global)?;
    match command {
        Commands::Publish(args) => publish::execute(&invocation, &args)?,
        Commands::RegisterEnv(args) => register_env::execute(&invocation, &args)?,
        Commands::UpdateDeployment(args) => update_deployment::execute(&invocation, &args)?,
        Commands::DeployGuard(args) => return deploy_guard::execute(&invocation, &args),
        Commands::Test(args) => return verify::execute(&invocation, &args),
        Commands::Proxy(args) => proxy::execute(&invocation, &args)?,
        Commands::Deploy => deploy::execute_deploy()?,
        Commands::Undeploy => deploy::execute_undeploy()?,
    }
    Ok(true)
}
