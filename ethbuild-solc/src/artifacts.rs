//! Solc input/output and artifact types

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SolcError},
    graph::Graph,
};

/// The output selection requested for every contract in every file: ABI,
/// creation bytecode, deployed bytecode and metadata. This is a fixed policy.
pub const OUTPUT_SELECTION: [&str; 4] = ["abi", "evm.bytecode", "evm.deployedBytecode", "metadata"];

/// Content of a single source file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub content: String,
}

/// Input type `solc` expects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompilerInput {
    pub language: String,
    pub sources: BTreeMap<String, Source>,
    pub settings: Settings,
}

impl CompilerInput {
    /// Flattens a dependency graph into compiler input: one entry per
    /// resolved file, full content inlined, no path rewriting.
    ///
    /// `evm_version` is omitted from the settings when not specified; its
    /// absence makes the compiler pick its own default.
    pub fn with_graph(graph: &Graph, optimizer: Optimizer, evm_version: Option<String>) -> Self {
        let sources = graph
            .resolved_files()
            .iter()
            .map(|file| (file.source_name.clone(), file.source.clone()))
            .collect();
        Self {
            language: "Solidity".to_string(),
            sources,
            settings: Settings {
                optimizer,
                metadata: Metadata { use_literal_content: true },
                output_selection: Settings::default_output_selection(),
                evm_version,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub optimizer: Optimizer,
    pub metadata: Metadata,
    pub output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_version: Option<String>,
}

impl Settings {
    fn default_output_selection() -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
        let mut wildcard = BTreeMap::new();
        wildcard
            .insert("*".to_string(), OUTPUT_SELECTION.iter().map(|s| s.to_string()).collect());
        let mut selection = BTreeMap::new();
        selection.insert("*".to_string(), wildcard);
        selection
    }
}

/// Solc optimizer settings, passed through to the compiler unchanged.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Optimizer {
    pub enabled: bool,
    pub runs: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "useLiteralContent")]
    pub use_literal_content: bool,
}

/// Output type `solc` produces.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompilerOutput {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Diagnostic>,
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, Contract>>,
}

impl CompilerOutput {
    /// Whether the output contains at least one error-severity diagnostic.
    /// Warnings alone do not fail a build.
    pub fn has_error(&self) -> bool {
        self.errors.iter().any(|err| err.severity == Severity::Error)
    }
}

/// A compiler diagnostic, error or warning.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_message: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.formatted_message.as_deref().unwrap_or(&self.message))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single compiled contract as solc emits it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contract {
    #[serde(default)]
    pub abi: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm: Option<Evm>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Evm {
    pub bytecode: Bytecode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_bytecode: Option<Bytecode>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bytecode {
    /// The bytecode as a hex string
    pub object: String,
    /// If non-empty, this is an unlinked object
    #[serde(default)]
    pub link_references: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

/// The artifact persisted for one contract.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub abi: Vec<serde_json::Value>,
    pub bytecode: String,
    pub link_references: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl Artifact {
    /// Converts a contract of the compiler output into its artifact.
    pub fn from_contract(contract_name: impl Into<String>, contract: &Contract) -> Self {
        let (bytecode, link_references) = contract
            .evm
            .as_ref()
            .map(|evm| {
                let object = &evm.bytecode.object;
                let bytecode = if object.starts_with("0x") {
                    object.clone()
                } else {
                    format!("0x{object}")
                };
                (bytecode, evm.bytecode.link_references.clone())
            })
            .unwrap_or_default();
        Self { contract_name: contract_name.into(), abi: contract.abi.clone(), bytecode, link_references }
    }
}

/// Determines how artifacts are persisted, one call per contract in the
/// compiler output.
#[async_trait]
pub trait ArtifactWriter: std::fmt::Debug + Send + Sync {
    async fn write(&self, artifact: &Artifact) -> Result<()>;
}

/// Writes one `<ContractName>.json` per contract into the artifacts
/// directory.
#[derive(Debug, Clone)]
pub struct DiskArtifacts {
    dir: PathBuf,
}

impl DiskArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactWriter for DiskArtifacts {
    async fn write(&self, artifact: &Artifact) -> Result<()> {
        let file = self.dir.join(format!("{}.json", artifact.contract_name));
        let content = serde_json::to_vec_pretty(artifact)?;
        tokio::fs::write(&file, content).await.map_err(|err| SolcError::io(err, file.clone()))?;
        tracing::trace!("wrote artifact \"{}\"", file.display());
        Ok(())
    }
}
