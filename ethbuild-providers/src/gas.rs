//! Gas limit and gas price middlewares.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{errors::Result, util, EthereumProvider};

/// Headroom applied to automatic gas estimations.
pub const DEFAULT_GAS_MULTIPLIER: f64 = 1.25;

/// Extra headroom for Ganache, whose estimations are known to run short.
pub const GANACHE_GAS_MULTIPLIER: f64 = 5.0;

/// The client-version signature Ganache nodes report.
const GANACHE_SIGNATURE: &str = "TestRPC";

/// Injects a constant `gas` into transactions lacking one and answers
/// `eth_estimateGas` with the same constant.
#[derive(Debug)]
pub struct FixedGasProvider<P> {
    inner: P,
    gas: u64,
}

impl<P: EthereumProvider> FixedGasProvider<P> {
    pub fn new(inner: P, gas: u64) -> Self {
        Self { inner, gas }
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for FixedGasProvider<P> {
    async fn send(&self, method: &str, mut params: Vec<Value>) -> Result<Value> {
        match method {
            "eth_sendTransaction" => {
                if let Some(tx) = util::transaction_object(&mut params) {
                    tx.entry("gas").or_insert_with(|| Value::from(self.gas));
                }
            }
            "eth_estimateGas" => return Ok(Value::from(self.gas)),
            _ => {}
        }
        self.inner.send(method, params).await
    }
}

/// Estimates gas through the inner provider and injects
/// `floor(estimate * multiplier)` into transactions lacking a `gas` value.
#[derive(Debug)]
pub struct AutomaticGasProvider<P> {
    inner: P,
    multiplier: f64,
}

impl<P: EthereumProvider> AutomaticGasProvider<P> {
    pub fn new(inner: P, multiplier: Option<f64>) -> Self {
        Self { inner, multiplier: multiplier.unwrap_or(DEFAULT_GAS_MULTIPLIER) }
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for AutomaticGasProvider<P> {
    async fn send(&self, method: &str, mut params: Vec<Value>) -> Result<Value> {
        if method == "eth_sendTransaction" {
            let needs_gas = util::transaction_object(&mut params)
                .map(|tx| !tx.contains_key("gas"))
                .unwrap_or_default();
            if needs_gas {
                let estimation =
                    self.inner.send("eth_estimateGas", vec![params[0].clone()]).await?;
                let gas = multiply_quantity(&estimation, self.multiplier)?;
                if let Some(tx) = util::transaction_object(&mut params) {
                    tx.insert("gas".to_string(), gas);
                }
            }
        }
        self.inner.send(method, params).await
    }
}

/// Injects a constant `gasPrice` into transactions lacking one and answers
/// `eth_gasPrice` with the same constant.
#[derive(Debug)]
pub struct FixedGasPriceProvider<P> {
    inner: P,
    gas_price: u64,
}

impl<P: EthereumProvider> FixedGasPriceProvider<P> {
    pub fn new(inner: P, gas_price: u64) -> Self {
        Self { inner, gas_price }
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for FixedGasPriceProvider<P> {
    async fn send(&self, method: &str, mut params: Vec<Value>) -> Result<Value> {
        match method {
            "eth_sendTransaction" => {
                if let Some(tx) = util::transaction_object(&mut params) {
                    tx.entry("gasPrice").or_insert_with(|| Value::from(self.gas_price));
                }
            }
            "eth_gasPrice" => return Ok(Value::from(self.gas_price)),
            _ => {}
        }
        self.inner.send(method, params).await
    }
}

/// Queries the inner provider's current gas price once per transaction and
/// injects it, verbatim, into transactions lacking a `gasPrice`.
#[derive(Debug)]
pub struct AutomaticGasPriceProvider<P> {
    inner: P,
}

impl<P: EthereumProvider> AutomaticGasPriceProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for AutomaticGasPriceProvider<P> {
    async fn send(&self, method: &str, mut params: Vec<Value>) -> Result<Value> {
        if method == "eth_sendTransaction" {
            let needs_price = util::transaction_object(&mut params)
                .map(|tx| !tx.contains_key("gasPrice"))
                .unwrap_or_default();
            if needs_price {
                let gas_price = self.inner.send("eth_gasPrice", Vec::new()).await?;
                if let Some(tx) = util::transaction_object(&mut params) {
                    tx.insert("gasPrice".to_string(), gas_price);
                }
            }
        }
        self.inner.send(method, params).await
    }
}

/// Compensates for Ganache's short gas estimations.
///
/// The node is identified once through `web3_clientVersion`; only when it
/// reports the Ganache signature are `eth_estimateGas` results multiplied by
/// [`GANACHE_GAS_MULTIPLIER`]. Against any other node every call is
/// forwarded untouched.
#[derive(Debug)]
pub struct GanacheGasMultiplierProvider<P> {
    inner: P,
    is_ganache: OnceCell<bool>,
}

impl<P: EthereumProvider> GanacheGasMultiplierProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner, is_ganache: OnceCell::new() }
    }

    async fn detect(&self) -> Result<bool> {
        let detected = self
            .is_ganache
            .get_or_try_init(|| async {
                let version = self.inner.send("web3_clientVersion", Vec::new()).await?;
                Ok::<_, crate::errors::ProviderError>(
                    version.as_str().map(|v| v.contains(GANACHE_SIGNATURE)).unwrap_or_default(),
                )
            })
            .await?;
        Ok(*detected)
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for GanacheGasMultiplierProvider<P> {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        if method != "eth_estimateGas" || !self.detect().await? {
            return self.inner.send(method, params).await
        }
        let estimation = self.inner.send(method, params).await?;
        Ok(multiply_quantity(&estimation, GANACHE_GAS_MULTIPLIER)?)
    }
}

/// `floor(quantity * multiplier)` re-encoded as a hex QUANTITY.
fn multiply_quantity(value: &Value, multiplier: f64) -> Result<Value> {
    let quantity = util::quantity_to_u128(value)?;
    let multiplied = (quantity as f64 * multiplier).floor() as u128;
    Ok(Value::String(util::to_quantity(multiplied)))
}
