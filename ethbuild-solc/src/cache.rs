//! Support for avoiding repeated `solc` invocations.
//!
//! The cache persists, per build, the compiler configuration used and the
//! modification timestamp of every file that went into the compiler input.
//! A subsequent build may be skipped when the configuration is unchanged,
//! the file set is exactly the same, and no file has been touched since.
//!
//! The cache is advisory: a missing or unreadable cache file, or one with a
//! different format tag, is treated as a miss and never as an error.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    config::SolcConfig,
    error::{Result, SolcError},
    resolver::ResolvedFile,
};

/// Format tag of the cache file, bumped on incompatible layout changes.
pub const SOL_CACHE_FORMAT: &str = "ethbuild-sol-cache-1";

/// The filename of the cache within the project's cache directory.
pub const SOL_CACHE_FILENAME: &str = "solidity-files-cache.json";

/// A persisted record of one successful build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SolFilesCache {
    #[serde(rename = "_format")]
    pub format: String,
    pub solc_config: SolcConfig,
    /// source name -> modification timestamp at the time of the build
    pub files: BTreeMap<String, u64>,
}

impl SolFilesCache {
    /// Creates a record for a build over the given resolved files.
    pub fn new(solc_config: SolcConfig, files: &[ResolvedFile]) -> Self {
        let files = files
            .iter()
            .map(|file| (file.source_name.clone(), file.last_modification_date))
            .collect();
        Self { format: SOL_CACHE_FORMAT.to_string(), solc_config, files }
    }

    /// Reads the cache from `path`, returning `None` on any kind of miss:
    /// file absent, unparseable, or written by an incompatible version.
    pub async fn read(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.ok()?;
        let cache: SolFilesCache = match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!("ignoring malformed cache file \"{}\": {}", path.display(), err);
                return None
            }
        };
        (cache.format == SOL_CACHE_FORMAT).then_some(cache)
    }

    /// Writes the cache to `path`, creating parent directories as needed.
    pub async fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| SolcError::io(err, parent.to_path_buf()))?;
        }
        let content = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|err| SolcError::io(err, path.to_path_buf()))?;
        tracing::trace!("wrote cache file \"{}\"", path.display());
        Ok(())
    }

    /// Whether a build over `files` with `config` can be skipped.
    ///
    /// True iff the configuration is identical, the current file set matches
    /// the cached one exactly (additions and removals both invalidate), and
    /// no file is newer than its cached timestamp.
    pub fn is_cached(&self, config: &SolcConfig, files: &[ResolvedFile]) -> bool {
        if self.solc_config != *config {
            tracing::trace!("cache miss, compiler config changed");
            return false
        }
        if self.files.len() != files.len() {
            tracing::trace!("cache miss, file set changed");
            return false
        }
        for file in files {
            match self.files.get(&file.source_name) {
                Some(&cached) if file.last_modification_date <= cached => {}
                Some(_) => {
                    tracing::trace!("cache miss, \"{}\" was modified", file.source_name);
                    return false
                }
                None => {
                    tracing::trace!("cache miss, \"{}\" is new", file.source_name);
                    return false
                }
            }
        }
        true
    }
}

/// Joins the conventional cache file location below a cache directory.
pub fn cache_file(cache_dir: impl AsRef<Path>) -> PathBuf {
    cache_dir.as_ref().join(SOL_CACHE_FILENAME)
}
