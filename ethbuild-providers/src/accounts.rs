//! Local transaction signing.
//!
//! [`LocalAccountsProvider`] manages a set of private keys, either given
//! directly or derived from an HD-wallet mnemonic, answers the account
//! listing methods from the derived addresses, and turns every
//! `eth_sendTransaction` into a locally signed `eth_sendRawTransaction`.
//! Networks with remote accounts simply skip this middleware.

use std::str::FromStr;

use async_trait::async_trait;
use coins_bip32::path::DerivationPath;
use coins_bip39::{English, Mnemonic};
use k256::ecdsa::SigningKey;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    chain_id::chain_id,
    errors::{ProviderError, Result},
    transaction::{secret_key_to_address, Address, TransactionRequest},
    util, EthereumProvider,
};

pub const DEFAULT_DERIVATION_PATH_PREFIX: &str = "m/44'/60'/0'/0/";

pub struct LocalAccountsProvider<P> {
    inner: P,
    /// managed keys in configuration order, the first one is the default
    /// sender
    accounts: Vec<(Address, SigningKey)>,
    /// applied to gas estimations resolved for transactions sent without an
    /// explicit `gas` field
    gas_multiplier: Option<f64>,
    chain_id: OnceCell<u64>,
}

// do not log the keys
impl<P: std::fmt::Debug> std::fmt::Debug for LocalAccountsProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAccountsProvider")
            .field("inner", &self.inner)
            .field(
                "accounts",
                &self.accounts.iter().map(|(address, _)| address).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<P: EthereumProvider> LocalAccountsProvider<P> {
    /// Manages the given hex-encoded private keys.
    pub fn new<S: AsRef<str>>(inner: P, private_keys: &[S]) -> Result<Self> {
        let mut accounts = Vec::with_capacity(private_keys.len());
        for private_key in private_keys {
            let private_key = private_key.as_ref();
            let bytes = hex::decode(private_key.strip_prefix("0x").unwrap_or(private_key))?;
            let key = SigningKey::from_bytes(&bytes)?;
            accounts.push((secret_key_to_address(&key), key));
        }
        Ok(Self { inner, accounts, gas_multiplier: None, chain_id: OnceCell::new() })
    }

    /// Derives `count` keys from a BIP-39 mnemonic, starting at
    /// `initial_index` below `path_prefix` (usually
    /// [`DEFAULT_DERIVATION_PATH_PREFIX`]).
    ///
    /// Derivation is deterministic: the same mnemonic, index and count always
    /// produce the same ordered address list.
    pub fn hd_wallet(
        inner: P,
        mnemonic: &str,
        initial_index: u32,
        count: u32,
        path_prefix: &str,
    ) -> Result<Self> {
        let mnemonic = Mnemonic::<English>::new_from_phrase(mnemonic)?;
        let mut accounts = Vec::with_capacity(count as usize);
        for index in initial_index..initial_index + count {
            let path = DerivationPath::from_str(&format!("{path_prefix}{index}"))?;
            let derived = mnemonic.derive_key(&path, None)?;
            let key: &coins_bip32::prelude::SigningKey = derived.as_ref();
            let key = SigningKey::from_bytes(&key.to_bytes())?;
            accounts.push((secret_key_to_address(&key), key));
        }
        Ok(Self { inner, accounts, gas_multiplier: None, chain_id: OnceCell::new() })
    }

    /// Multiplies the gas estimations this signer resolves for transactions
    /// sent without an explicit `gas` field. The product is floored.
    #[must_use]
    pub fn gas_multiplier(mut self, multiplier: f64) -> Self {
        self.gas_multiplier = Some(multiplier);
        self
    }

    fn addresses(&self) -> Value {
        Value::Array(
            self.accounts
                .iter()
                .map(|(address, _)| Value::String(address.to_string()))
                .collect(),
        )
    }

    fn key_for(&self, address: &Address) -> Option<&SigningKey> {
        self.accounts.iter().find(|(known, _)| known == address).map(|(_, key)| key)
    }

    async fn sign_and_send(&self, tx_value: &Value) -> Result<Value> {
        let mut tx = TransactionRequest::from_value(tx_value)?;

        let from = match tx.from {
            Some(from) => from,
            None => {
                self.accounts
                    .first()
                    .map(|(address, _)| *address)
                    .ok_or_else(|| ProviderError::custom("no managed accounts"))?
            }
        };
        let key = self
            .key_for(&from)
            .ok_or_else(|| ProviderError::InvalidSender { from: from.to_string() })?;
        tx.from = Some(from);

        if tx.nonce.is_none() {
            let nonce = self
                .inner
                .send(
                    "eth_getTransactionCount",
                    vec![Value::String(from.to_string()), Value::String("pending".to_string())],
                )
                .await?;
            tx.nonce = Some(util::quantity_to_u64(&nonce)?);
        }
        // gas fields are resolved through the inner chain, where the
        // configured gas middlewares answer eth_gasPrice/eth_estimateGas
        if tx.gas_price.is_none() {
            let gas_price = self.inner.send("eth_gasPrice", Vec::new()).await?;
            tx.gas_price = Some(util::quantity_to_u128(&gas_price)?);
        }
        if tx.gas.is_none() {
            let estimation = self.inner.send("eth_estimateGas", vec![tx.to_value()]).await?;
            let estimation = util::quantity_to_u128(&estimation)?;
            tx.gas = Some(match self.gas_multiplier {
                Some(multiplier) => (estimation as f64 * multiplier).floor() as u128,
                None => estimation,
            });
        }

        let chain_id = *self.chain_id.get_or_try_init(|| chain_id(&self.inner)).await?;
        let signature = tx.sign(key, chain_id)?;
        let raw = tx.rlp_signed(&signature);

        tracing::trace!(from = %from, "signed transaction locally");
        self.inner
            .send("eth_sendRawTransaction", vec![Value::String(format!("0x{}", hex::encode(raw)))])
            .await
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for LocalAccountsProvider<P> {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        match method {
            "eth_accounts" | "eth_requestAccounts" => Ok(self.addresses()),
            "eth_sendTransaction" => {
                let tx = params.first().cloned().unwrap_or_else(|| Value::Object(Default::default()));
                self.sign_and_send(&tx).await
            }
            _ => self.inner.send(method, params).await,
        }
    }
}
