//! Invoking the `solc` binary.

use std::{
    path::PathBuf,
    process::{Output, Stdio},
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};

use crate::{
    artifacts::{CompilerInput, CompilerOutput},
    error::{Result, SolcError},
};

/// Compiles a standard-json input into a standard-json output.
///
/// The default implementation shells out to a `solc` binary, but anything
/// that understands the format qualifies, which is what the tests rely on.
#[async_trait]
pub trait Compiler: std::fmt::Debug + Send + Sync {
    async fn compile(&self, input: &CompilerInput) -> Result<CompilerOutput>;
}

/// Abstraction over the `solc` command line interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solc {
    /// Path to the solc executable
    pub solc: PathBuf,
    /// Additional arguments passed to the executable
    pub args: Vec<String>,
}

impl Default for Solc {
    fn default() -> Self {
        Self::new("solc")
    }
}

impl Solc {
    /// A new instance which points to `solc`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { solc: path.into(), args: Vec::new() }
    }

    /// Adds an argument to pass to solc
    #[must_use]
    pub fn arg<T: Into<String>>(mut self, arg: T) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns the version of the configured binary, the `x.y.z` part of
    /// `solc --version` output.
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.solc)
            .arg("--version")
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .stdout(Stdio::piped())
            .output()
            .await
            .map_err(|err| SolcError::io(err, self.solc.clone()))?;
        if !output.status.success() {
            return Err(SolcError::solc(String::from_utf8_lossy(&output.stderr).to_string()))
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .filter_map(|line| line.trim().strip_prefix("Version: "))
            .map(|version| version.split('+').next().unwrap_or(version).to_string())
            .next()
            .ok_or_else(|| SolcError::solc("version not found in solc output"))
    }

    async fn run(&self, input: &CompilerInput) -> Result<Output> {
        let mut child = Command::new(&self.solc)
            .args(&self.args)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|err| SolcError::io(err, self.solc.clone()))?;
        if let Some(stdin) = child.stdin.as_mut() {
            let content = serde_json::to_vec(input)?;
            stdin.write_all(&content).await.map_err(|err| SolcError::io(err, self.solc.clone()))?;
        }
        child.wait_with_output().await.map_err(|err| SolcError::io(err, self.solc.clone()))
    }
}

#[async_trait]
impl Compiler for Solc {
    /// Compiles with `--standard-json` and deserializes the output.
    async fn compile(&self, input: &CompilerInput) -> Result<CompilerOutput> {
        tracing::trace!("compiling {} files with {}", input.sources.len(), self.solc.display());
        let output = self.run(input).await?;
        if !output.status.success() {
            return Err(SolcError::solc(String::from_utf8_lossy(&output.stderr).to_string()))
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
