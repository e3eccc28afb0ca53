#![doc = include_str!("../README.md")]

pub mod accounts;
pub mod chain_id;
pub mod construction;
pub mod errors;
pub mod gas;
pub mod http;
pub mod mock;
pub mod sender;
pub mod transaction;
pub mod util;

use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;
use serde_json::Value;

pub use accounts::{LocalAccountsProvider, DEFAULT_DERIVATION_PATH_PREFIX};
pub use chain_id::{chain_id, ChainIdValidatorProvider};
pub use construction::{
    create_provider, wrap_provider, AccountsConfig, GasConfig, HdAccountsConfig, NetworkConfig,
};
pub use errors::{JsonRpcError, ProviderError, Result};
pub use gas::{
    AutomaticGasPriceProvider, AutomaticGasProvider, FixedGasPriceProvider, FixedGasProvider,
    GanacheGasMultiplierProvider, DEFAULT_GAS_MULTIPLIER, GANACHE_GAS_MULTIPLIER,
};
pub use http::HttpProvider;
pub use mock::MockProvider;
pub use sender::{AutomaticSenderProvider, FixedSenderProvider};
pub use transaction::{secret_key_to_address, Address, Signature, TransactionRequest};

/// The capability every layer of the provider chain exposes: a JSON-RPC
/// request in, a JSON value or an error out.
///
/// Middlewares hold exactly one inner [`EthereumProvider`] and must forward
/// any method they do not recognize to it unchanged, returning its response
/// or error verbatim.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait EthereumProvider: Debug + Send + Sync {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value>;
}
