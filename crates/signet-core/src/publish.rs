//! Consumer and provider publish flows: resolve the revision, load the
//! document, build the body and post it to the broker.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::body::{build_consumer_request, build_provider_request, BodyError};
use crate::broker::{BrokerClient, BrokerError};
use crate::loader::{load_contract, load_spec, LoadError};
use crate::vcs::{wants_default, Git, VcsError, AUTO};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("must set --provider-name if --type is \"provider\"")]
    MissingProviderName,
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Body(#[from] BodyError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Consumer,
    Provider,
}

impl Role {
    /// Consumers default an empty version; providers only default `auto`.
    pub fn defaults_version(self, version: &str) -> bool {
        match self {
            Role::Consumer => wants_default(version),
            Role::Provider => version == AUTO,
        }
    }

    /// `auto` always defaults the branch. An empty branch follows the version:
    /// it is defaulted only when the version is being defaulted too.
    pub fn defaults_branch(self, version: &str, branch: &str) -> bool {
        branch == AUTO || (branch.is_empty() && self.defaults_version(version))
    }
}

/// Version and branch sent with a published document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Revision {
    pub version: String,
    pub branch: String,
}

pub fn resolve_revision(
    role: Role,
    git: &Git,
    version: &str,
    branch: &str,
) -> Result<Revision, VcsError> {
    let branch = if role.defaults_branch(version, branch) {
        git.current_branch()?
    } else {
        branch.to_string()
    };
    let version = if role.defaults_version(version) {
        git.short_sha()?
    } else {
        version.to_string()
    };
    Ok(Revision { version, branch })
}

/// Publish the consumer contract at `path`. The consumer name comes from the
/// contract itself.
pub fn publish_consumer(
    client: &BrokerClient,
    git: &Git,
    path: &Path,
    version: &str,
    branch: &str,
) -> Result<Revision, PublishError> {
    let revision = resolve_revision(Role::Consumer, git, version, branch)?;
    let contract = load_contract(path)?;
    let body = build_consumer_request(
        &contract,
        &contract.consumer.name,
        &revision.version,
        &revision.branch,
    )?;
    client.publish_contract(body)?;
    info!(
        consumer = %contract.consumer.name,
        version = %revision.version,
        branch = %revision.branch,
        "consumer contract published"
    );
    Ok(revision)
}

pub fn publish_provider(
    client: &BrokerClient,
    git: &Git,
    path: &Path,
    provider_name: &str,
    version: &str,
    branch: &str,
) -> Result<Revision, PublishError> {
    if provider_name.is_empty() {
        return Err(PublishError::MissingProviderName);
    }
    let revision = resolve_revision(Role::Provider, git, version, branch)?;
    let spec = load_spec(path)?;
    let body = build_provider_request(&spec, provider_name, &revision.version, &revision.branch)?;
    client.publish_spec(body)?;
    info!(
        provider = %provider_name,
        version = %revision.version,
        branch = %revision.branch,
        "provider spec published"
    );
    Ok(revision)
}
