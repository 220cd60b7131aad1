//! Building blocks for the Signet contract broker CLI.
//! Covers loading consumer contracts and provider specs, shaping broker request
//! bodies, talking to the broker over HTTP, and turning recorded stub-server
//! traffic into pact files.

pub mod body;
pub mod broker;
pub mod config;
pub mod contract;
pub mod loader;
pub mod pact;
pub mod publish;
pub mod toolchain;
pub mod vcs;

pub use body::{
    build_consumer_request, build_deployment_request, build_environment_request,
    build_provider_request, BodyError,
};
pub use broker::{BrokerClient, BrokerError, DeployGuardError, DeployGuardResponse};
pub use config::{CommandConfig, ConfigError, RcFile};
pub use contract::{Pact, Participant, Spec, SpecFormat};
pub use loader::{load_contract, load_spec, LoadError};
pub use pact::{create_pact, Interaction, PactError, WriteOutcome};
pub use publish::{publish_consumer, publish_provider, PublishError, Revision, Role};
pub use toolchain::{PackageRoot, ToolchainError};
pub use vcs::{Git, VcsError, AUTO};
