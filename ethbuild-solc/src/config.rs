use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{artifacts::Optimizer, cache};

/// Where to find all files or where to write them to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectPathsConfig {
    /// Project root
    pub root: PathBuf,
    /// Path to the contract sources
    pub sources: PathBuf,
    /// Where to store the build cache
    pub cache: PathBuf,
    /// Where to store the compiled artifacts
    pub artifacts: PathBuf,
}

impl ProjectPathsConfig {
    /// The conventional layout below a project root: `contracts/` for
    /// sources, `cache/` and `artifacts/` for outputs.
    pub fn hardhat(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            sources: root.join("contracts"),
            cache: root.join("cache"),
            artifacts: root.join("artifacts"),
            root,
        }
    }

    /// The full path of the cache file.
    pub fn cache_file(&self) -> PathBuf {
        cache::cache_file(&self.cache)
    }
}

/// The compiler configuration a build depends on. Two builds with equal
/// configs over equal inputs produce equal outputs, which is what makes the
/// config part of the cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SolcConfig {
    /// Requested compiler version, e.g. `0.8.17`
    pub version: String,
    pub optimizer: Optimizer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_version: Option<String>,
}

impl SolcConfig {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            optimizer: Optimizer { enabled: false, runs: 200 },
            evm_version: None,
        }
    }
}

impl AsRef<Path> for ProjectPathsConfig {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}
