pub mod deploy;
pub mod deploy_guard;
pub mod proxy;
pub mod publish;
pub mod register_env;
pub mod update_deployment;
pub mod util;
pub mod verify;

pub use deploy_guard::DeployGuardArgs;
pub use proxy::ProxyArgs;
pub use publish::PublishArgs;
pub use register_env::RegisterEnvArgs;
pub use update_deployment::UpdateDeploymentArgs;
pub use util::GlobalArgs;
pub use verify::VerifyArgs;
