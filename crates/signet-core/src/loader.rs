use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::contract::{Pact, Spec, SpecFormat};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("open {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("spec must be either JSON or YAML")]
    UnsupportedSpecFormat { path: PathBuf },
}

/// Read a consumer contract from disk.
pub fn load_contract(path: &Path) -> Result<Pact, LoadError> {
    let raw = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a provider spec from disk. The format is decided by the path before the
/// file is opened, so unsupported extensions fail even for missing files.
pub fn load_spec(path: &Path) -> Result<Spec, LoadError> {
    let format = SpecFormat::detect(path).ok_or_else(|| LoadError::UnsupportedSpecFormat {
        path: path.to_path_buf(),
    })?;
    debug!(path = %path.display(), format = format.as_str(), "loading provider spec");

    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    match format {
        SpecFormat::Json => {
            let raw = fs::read(path).map_err(io_err)?;
            let value = serde_json::from_slice(&raw).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Spec::Json(value))
        }
        SpecFormat::Yaml => Ok(Spec::Yaml(fs::read_to_string(path).map_err(io_err)?)),
    }
}
