//! Chain id detection and validation.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    errors::{ProviderError, Result},
    util, EthereumProvider,
};

/// Queries the chain id of the connected node.
pub async fn chain_id<P: EthereumProvider>(provider: &P) -> Result<u64> {
    let id = provider.send("eth_chainId", Vec::new()).await?;
    util::quantity_to_u64(&id)
}

/// Rejects every request while the connected node's chain id disagrees with
/// the configured one.
///
/// The remote id is probed once on first use and cached for the lifetime of
/// the provider; concurrent first callers share the single in-flight probe.
/// A mismatch fails each call individually, it is not a terminal state of the
/// provider.
#[derive(Debug)]
pub struct ChainIdValidatorProvider<P> {
    inner: P,
    expected: u64,
    remote: OnceCell<u64>,
}

impl<P: EthereumProvider> ChainIdValidatorProvider<P> {
    pub fn new(inner: P, expected: u64) -> Self {
        Self { inner, expected, remote: OnceCell::new() }
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for ChainIdValidatorProvider<P> {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let connected = *self.remote.get_or_try_init(|| chain_id(&self.inner)).await?;
        if connected != self.expected {
            return Err(ProviderError::InvalidChainId { configured: self.expected, connected })
        }
        self.inner.send(method, params).await
    }
}
