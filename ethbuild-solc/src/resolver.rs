//! Resolution of single source files.
//!
//! A [`Resolver`] maps project paths and import specifiers to
//! [`ResolvedFile`]s. It performs no caching: every call reads from disk, and
//! callers decide when to re-resolve. Transitive resolution lives in
//! [`crate::graph`].

use std::{
    io,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use md5::{Digest, Md5};

use crate::{
    artifacts::Source,
    error::{Result, SolcError},
    parse, utils,
};

/// The name of the directory searched for library imports, walking up from
/// the project root.
pub const LIBRARY_DIR: &str = "node_modules";

/// A source file together with everything the pipeline needs to know about
/// it: its logical name, content fingerprint and raw import specifiers.
///
/// Immutable once constructed. Two resolutions of the same file produce
/// independent values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// normalized absolute location on disk
    pub path: PathBuf,
    /// project-relative logical name, `contracts/Token.sol`, or the import
    /// specifier as written for library files
    pub source_name: String,
    pub source: Source,
    /// hex digest of the content
    pub content_hash: String,
    /// mtime reported by the filesystem, in epoch millis
    pub last_modification_date: u64,
    /// import specifiers as written in the source, in source order, unresolved
    pub imports: Vec<String>,
}

/// Resolves project and library source files relative to a project root.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a file that belongs to the project itself, its source name
    /// being the path relative to the project root.
    pub async fn resolve_project_source_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ResolvedFile> {
        let path = utils::normalize_path(path.as_ref());
        let source_name = utils::source_name(&path, &self.root);
        self.read_file(path, source_name).await
    }

    /// Resolves one import specifier of `from`, dispatching between relative
    /// and library resolution.
    pub async fn resolve_import(&self, specifier: &str, from: &ResolvedFile) -> Result<ResolvedFile> {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            self.resolve_relative_import(specifier, from).await
        } else {
            self.resolve_library_source_file(specifier, from).await
        }
    }

    /// Resolves a non-relative import like `pkg/contracts/Lib.sol` by walking
    /// up from the project root looking for a library directory containing
    /// the package named by the first path segment.
    ///
    /// The specifier as written becomes the file's source name.
    pub async fn resolve_library_source_file(
        &self,
        specifier: &str,
        from: &ResolvedFile,
    ) -> Result<ResolvedFile> {
        let library = specifier.split('/').next().unwrap_or(specifier);
        for dir in self.root.ancestors() {
            let libs = dir.join(LIBRARY_DIR);
            if !libs.join(library).is_dir() {
                continue
            }
            let path = utils::normalize_path(&libs.join(specifier));
            return match self.read_file(path, specifier.to_string()).await {
                Err(SolcError::FileNotFound(_)) => Err(SolcError::LibraryFileNotFound {
                    library: library.to_string(),
                    specifier: specifier.to_string(),
                }),
                other => other,
            }
        }
        tracing::trace!("no library dir provides \"{}\"", specifier);
        Err(SolcError::ImportNotFound {
            specifier: specifier.to_string(),
            from: from.path.clone(),
        })
    }

    async fn resolve_relative_import(
        &self,
        specifier: &str,
        from: &ResolvedFile,
    ) -> Result<ResolvedFile> {
        let dir = from.path.parent().unwrap_or_else(|| Path::new(""));
        let path = utils::normalize_path(&dir.join(specifier));
        let source_name = utils::join_source_names(&from.source_name, specifier);
        match self.read_file(path, source_name).await {
            Err(SolcError::FileNotFound(_)) => Err(SolcError::ImportNotFound {
                specifier: specifier.to_string(),
                from: from.path.clone(),
            }),
            other => other,
        }
    }

    async fn read_file(&self, path: PathBuf, source_name: String) -> Result<ResolvedFile> {
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SolcError::FileNotFound(path))
            }
            Err(err) => return Err(SolcError::io(err, path)),
        };
        let last_modification_date = metadata
            .modified()
            .map_err(|err| SolcError::io(err, path.clone()))?
            .duration_since(UNIX_EPOCH)
            .map_err(|err| SolcError::solc(err.to_string()))?
            .as_millis() as u64;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| SolcError::io(err, path.clone()))?;
        let content_hash = hex::encode(Md5::digest(content.as_bytes()));
        let imports = parse::find_import_paths(&content).into_iter().map(str::to_string).collect();

        Ok(ResolvedFile {
            path,
            source_name,
            source: Source { content },
            content_hash,
            last_modification_date,
            imports,
        })
    }
}
