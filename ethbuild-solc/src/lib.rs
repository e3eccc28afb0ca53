#![doc = include_str!("../README.md")]

pub mod artifacts;
pub mod cache;
pub mod compile;
pub mod config;
pub mod error;
pub mod graph;
pub mod parse;
pub mod resolver;
pub mod utils;

pub use artifacts::{
    Artifact, ArtifactWriter, CompilerInput, CompilerOutput, Diagnostic, DiskArtifacts, Optimizer,
    Severity, Source,
};
pub use cache::SolFilesCache;
pub use compile::{Compiler, Solc};
pub use config::{ProjectPathsConfig, SolcConfig};
pub use error::{Result, SolcError, SolcIoError};
pub use graph::Graph;
pub use resolver::{ResolvedFile, Resolver};

use futures_util::future::try_join_all;

/// Represents a project workspace and handles `solc` compiling of all
/// contracts in that workspace.
#[derive(Debug)]
pub struct Project<C = Solc> {
    /// The layout of the project
    pub paths: ProjectPathsConfig,
    /// The compiler configuration, also the cache key
    pub solc_config: SolcConfig,
    compiler: C,
    artifacts: Box<dyn ArtifactWriter>,
}

impl Project<Solc> {
    /// A project over the conventional layout below `root`, compiling with a
    /// `solc` binary from the path and writing artifacts as json files.
    pub fn hardhat(root: impl Into<std::path::PathBuf>, solc_config: SolcConfig) -> Self {
        let paths = ProjectPathsConfig::hardhat(root);
        let artifacts = Box::new(DiskArtifacts::new(&paths.artifacts));
        Self { paths, solc_config, compiler: Solc::default(), artifacts }
    }
}

impl<C: Compiler> Project<C> {
    pub fn new(
        paths: ProjectPathsConfig,
        solc_config: SolcConfig,
        compiler: C,
        artifacts: Box<dyn ArtifactWriter>,
    ) -> Self {
        Self { paths, solc_config, compiler, artifacts }
    }

    /// Compiles every contract below the sources directory, together with the
    /// transitive closure of its imports.
    ///
    /// Consults the build cache first: when nothing changed since the last
    /// build the compiler is not invoked at all. `force` skips that check but
    /// the cache is rewritten either way.
    ///
    /// Fails with [`SolcError::CompilerDiagnostics`] when the compiler
    /// reports any error. Warnings alone do not fail the build, but they are
    /// logged and included in the returned output.
    pub async fn compile(&self, force: bool) -> Result<ProjectCompileOutput> {
        let sources = utils::source_files(&self.paths.sources);
        if sources.is_empty() {
            tracing::trace!("nothing to compile in \"{}\"", self.paths.sources.display());
            return Ok(ProjectCompileOutput::Empty)
        }

        let resolver = Resolver::new(&self.paths.root);
        let seeds =
            try_join_all(sources.iter().map(|path| resolver.resolve_project_source_file(path)))
                .await?;
        let graph = Graph::from_resolved_files(&resolver, seeds).await?;

        let cache_file = self.paths.cache_file();
        if !force {
            if let Some(cache) = SolFilesCache::read(&cache_file).await {
                if cache.is_cached(&self.solc_config, graph.resolved_files()) {
                    tracing::trace!("unchanged, skipping compilation");
                    return Ok(ProjectCompileOutput::Unchanged)
                }
            }
        }

        let input = CompilerInput::with_graph(
            &graph,
            self.solc_config.optimizer.clone(),
            self.solc_config.evm_version.clone(),
        );
        let output = self.compiler.compile(&input).await?;
        if output.has_error() {
            return Err(SolcError::CompilerDiagnostics(output.errors))
        }
        for warning in &output.errors {
            tracing::warn!("{}", warning);
        }

        self.write_artifacts(&output).await?;
        SolFilesCache::new(self.solc_config.clone(), graph.resolved_files())
            .write(&cache_file)
            .await?;

        Ok(ProjectCompileOutput::Compiled(output))
    }

    async fn write_artifacts(&self, output: &CompilerOutput) -> Result<()> {
        tokio::fs::create_dir_all(&self.paths.artifacts)
            .await
            .map_err(|err| SolcError::io(err, self.paths.artifacts.clone()))?;
        for contracts in output.contracts.values() {
            for (name, contract) in contracts {
                self.artifacts.write(&Artifact::from_contract(name, contract)).await?;
            }
        }
        Ok(())
    }
}

/// The outcome of a [`Project::compile`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectCompileOutput {
    /// The sources directory contains no solidity files
    Empty,
    /// Nothing changed since the last build, the cached artifacts are current
    Unchanged,
    /// The compiler ran, artifacts and cache were written
    Compiled(CompilerOutput),
}

impl ProjectCompileOutput {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, ProjectCompileOutput::Unchanged)
    }
}
