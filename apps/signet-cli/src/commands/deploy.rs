//! Broker infrastructure on AWS: one CloudFormation stack created from the
//! template bundled with the npm package.

use std::fs;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::{Capability, StackStatus};
use aws_sdk_cloudformation::Client;
use signet_core::PackageRoot;
use tokio::time::{sleep, Instant};
use tracing::debug;

use super::util::runtime;

pub const STACK_NAME: &str = "signetbroker";
const WAIT_LIMIT: Duration = Duration::from_secs(15 * 60);
const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    Created,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Progress {
    Pending,
    Done,
    Failed(String),
}

/// Map a stack status onto progress toward `goal`. `None` means the stack no
/// longer exists.
fn evaluate(goal: Goal, status: Option<&StackStatus>) -> Progress {
    match (goal, status) {
        (Goal::Created, Some(StackStatus::CreateComplete)) => Progress::Done,
        (Goal::Created, Some(StackStatus::CreateInProgress)) => Progress::Pending,
        (Goal::Created, None) => Progress::Failed("stack no longer exists".into()),
        (Goal::Deleted, None | Some(StackStatus::DeleteComplete)) => Progress::Done,
        (Goal::Deleted, Some(StackStatus::DeleteInProgress)) => Progress::Pending,
        (_, Some(other)) => Progress::Failed(other.as_str().to_string()),
    }
}

pub fn execute_deploy() -> Result<()> {
    let template_path = PackageRoot::discover()
        .context("unable to find signet-cli global npm package")?
        .cloudformation_template();
    let template = fs::read_to_string(&template_path).with_context(|| {
        format!(
            "unable to load CloudFormation template {}",
            template_path.display()
        )
    })?;
    runtime()?.block_on(create_stack(template))
}

pub fn execute_undeploy() -> Result<()> {
    runtime()?.block_on(delete_stack())
}

async fn create_stack(template: String) -> Result<()> {
    let client = cloudformation_client().await;
    client
        .create_stack()
        .stack_name(STACK_NAME)
        .template_body(template)
        .capabilities(Capability::CapabilityIam)
        .send()
        .await
        .map_err(|err| {
            anyhow!(
                "unable to create CloudFormation stack: {}",
                DisplayErrorContext(&err)
            )
        })?;
    println!("Deploying - deploying Signet broker to your AWS cloud using ECS with Fargate, this will take a few minutes...");
    wait_for(&client, Goal::Created).await.context(
        "error while waiting for CloudFormation stack to be created; check your AWS console for the status of the deployment",
    )?;
    println!("Deployed Successfully");
    Ok(())
}

async fn delete_stack() -> Result<()> {
    let client = cloudformation_client().await;
    client
        .delete_stack()
        .stack_name(STACK_NAME)
        .send()
        .await
        .map_err(|err| {
            anyhow!(
                "unable to delete CloudFormation stack: {}",
                DisplayErrorContext(&err)
            )
        })?;
    println!("Undeploying - tearing down the Signet broker ECS Cluster, this will take a few minutes...");
    wait_for(&client, Goal::Deleted).await.context(
        "error while waiting for CloudFormation stack to be deleted; check your AWS console for the status of the teardown",
    )?;
    println!("Undeployed Successfully");
    Ok(())
}

async fn cloudformation_client() -> Client {
    let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
    Client::new(&shared)
}

async fn stack_status(client: &Client) -> Result<Option<StackStatus>> {
    match client.describe_stacks().stack_name(STACK_NAME).send().await {
        Ok(output) => Ok(output
            .stacks()
            .first()
            .and_then(|stack| stack.stack_status().cloned())),
        Err(err) => {
            let message = DisplayErrorContext(&err).to_string();
            if message.contains("does not exist") {
                Ok(None)
            } else {
                bail!("unable to describe CloudFormation stack: {message}")
            }
        }
    }
}

async fn wait_for(client: &Client, goal: Goal) -> Result<()> {
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        let status = stack_status(client).await?;
        debug!(?goal, status = ?status, "stack status");
        match evaluate(goal, status.as_ref()) {
            Progress::Done => return Ok(()),
            Progress::Failed(status) => bail!("stack {STACK_NAME} reached {status}"),
            Progress::Pending => {}
        }
        if Instant::now() >= deadline {
            bail!("timed out after {} minutes", WAIT_LIMIT.as_secs() / 60);
        }
        sleep(POLL_INTERVAL).await;
    }
}
