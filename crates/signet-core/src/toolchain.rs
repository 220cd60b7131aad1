//! The verification tool, stub server and CloudFormation template ship in the
//! `signet-cli` npm package. This module finds that package and runs its tools.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::contract::SpecFormat;

/// Overrides npm discovery of the package root.
pub const PKG_ROOT_ENV: &str = "SIGNET_PKG_ROOT";
pub const PACKAGE_NAME: &str = "signet-cli";

static NODE_WARNING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\(node(.+)warning was created\)\n").expect("node warning pattern compiles")
});

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("Could not find npm root")]
    NpmRootNotFound,
    #[error("npm root path was empty string")]
    EmptyNpmRoot,
    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Root directory of the installed `signet-cli` package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRoot {
    root: PathBuf,
}

impl PackageRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `SIGNET_PKG_ROOT` when set, otherwise `$(npm root -g)/signet-cli`.
    pub fn discover() -> Result<Self, ToolchainError> {
        if let Some(root) = env::var_os(PKG_ROOT_ENV).filter(|v| !v.is_empty()) {
            debug!(root = ?root, "package root from environment");
            return Ok(Self::new(root));
        }
        let output = Command::new("npm")
            .args(["root", "-g"])
            .output()
            .map_err(|source| ToolchainError::Spawn {
                program: "npm".into(),
                source,
            })?;
        if !output.status.success() {
            return Err(ToolchainError::NpmRootNotFound);
        }
        Self::from_npm_output(&String::from_utf8_lossy(&output.stdout))
    }

    /// Build from the text printed by `npm root -g`.
    pub fn from_npm_output(text: &str) -> Result<Self, ToolchainError> {
        let global = text.trim_end_matches(['\r', '\n']);
        if global.is_empty() {
            return Err(ToolchainError::EmptyNpmRoot);
        }
        Ok(Self::new(Path::new(global).join(PACKAGE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn dredd(&self) -> PathBuf {
        self.root.join("node_modules").join("dredd")
    }

    pub fn mountebank(&self) -> PathBuf {
        self.root.join("node_modules").join("mountebank")
    }

    pub fn mountebank_config(&self) -> PathBuf {
        self.root.join("config.ejs")
    }

    pub fn mountebank_data(&self) -> PathBuf {
        self.root.join("mbdata")
    }

    /// Where the stub server records traffic for the imposter on `port`.
    pub fn stubs_dir(&self, port: u16) -> PathBuf {
        self.mountebank_data().join(port.to_string()).join("stubs")
    }

    pub fn spec_file(&self, format: SpecFormat) -> PathBuf {
        self.root
            .join("specs")
            .join(format!("spec.{}", format.as_str()))
    }

    pub fn cloudformation_template(&self) -> PathBuf {
        self.root.join("cftemplate.yaml")
    }
}

/// Exit status and combined stdout/stderr of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub text: String,
}

impl CapturedOutput {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Run `cmd` to completion and return its combined output.
pub fn run_captured(cmd: &mut Command) -> Result<CapturedOutput, ToolchainError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    debug!(%program, args = ?cmd.get_args().collect::<Vec<_>>(), "running tool");
    let output = cmd
        .output()
        .map_err(|source| ToolchainError::Spawn { program, source })?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(CapturedOutput {
        success: output.status.success(),
        code: output.status.code(),
        text,
    })
}

/// Drop the `(node:...) ... warning was created)` blocks Node prints.
pub fn strip_node_warnings(text: &str) -> String {
    NODE_WARNING.replace_all(text, "").into_owned()
}
