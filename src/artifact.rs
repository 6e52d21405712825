//! Compiled contract artifacts.
//!
//! Reads the JSON written by Foundry (`out/<File>.sol/<Name>.json`, bytecode
//! under `bytecode.object`) or Hardhat (`artifacts/.../<Name>.json`,
//! bytecode as a plain hex string). Only the ABI and creation bytecode are
//! used.

use alloy::json_abi::{ContractObject, JsonAbi};
use alloy::primitives::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::contract::Interface;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact is not valid contract JSON")]
    Json(#[from] serde_json::Error),
    #[error("artifact {name} has no ABI")]
    MissingAbi { name: String },
    #[error("artifact {name} has no creation bytecode")]
    MissingBytecode { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: JsonAbi,
    /// Creation (init) code.
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Loads an artifact file. The contract name is the file stem.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(path = %path.display(), %name, "Loading contract artifact");
        Self::from_json(name, &json)
    }

    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, ArtifactError> {
        let name = name.into();
        let object: ContractObject = serde_json::from_str(json)?;

        let Some(abi) = object.abi else {
            return Err(ArtifactError::MissingAbi { name });
        };

        // Interfaces and abstract contracts compile to an empty "0x".
        let bytecode = match object.bytecode {
            Some(bytecode) if !bytecode.is_empty() => bytecode,
            _ => return Err(ArtifactError::MissingBytecode { name }),
        };

        Ok(Self {
            name,
            abi,
            bytecode,
        })
    }

    pub fn interface(&self) -> Interface {
        Interface::new(self.name.clone(), self.abi.clone())
    }
}
