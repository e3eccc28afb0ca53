//! Network configuration and provider chain construction.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::{
    accounts::{LocalAccountsProvider, DEFAULT_DERIVATION_PATH_PREFIX},
    chain_id::ChainIdValidatorProvider,
    errors::Result,
    gas::{
        AutomaticGasPriceProvider, AutomaticGasProvider, FixedGasPriceProvider, FixedGasProvider,
        GanacheGasMultiplierProvider, DEFAULT_GAS_MULTIPLIER,
    },
    http::HttpProvider,
    sender::{AutomaticSenderProvider, FixedSenderProvider},
    EthereumProvider,
};

/// Configuration of one network connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub url: String,
    /// When set, every request is validated against the connected chain
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Default transaction sender; when unset the node's first account is
    /// used
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub gas_price: GasConfig,
    /// Multiplier for automatic gas estimations
    #[serde(default)]
    pub gas_multiplier: Option<f64>,
    /// `None` means the accounts live on the remote node
    #[serde(default)]
    pub accounts: Option<AccountsConfig>,
}

/// Either `"auto"` or a fixed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GasConfig {
    #[default]
    Auto,
    Fixed(u64),
}

impl<'de> Deserialize<'de> for GasConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) if s == "auto" => Ok(GasConfig::Auto),
            Value::Number(n) => n
                .as_u64()
                .map(GasConfig::Fixed)
                .ok_or_else(|| de::Error::custom(format!("invalid gas value: {n}"))),
            other => Err(de::Error::custom(format!("expected \"auto\" or an integer, got {other}"))),
        }
    }
}

/// Locally managed accounts, either explicit keys or an HD wallet.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountsConfig {
    Local(Vec<String>),
    Hd(HdAccountsConfig),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HdAccountsConfig {
    pub mnemonic: String,
    #[serde(default)]
    pub initial_index: u32,
    #[serde(default = "default_hd_count")]
    pub count: u32,
    #[serde(default = "default_hd_path")]
    pub path: String,
}

fn default_hd_count() -> u32 {
    20
}

fn default_hd_path() -> String {
    DEFAULT_DERIVATION_PATH_PREFIX.to_string()
}

/// Wraps a base transport with the configured middleware chain.
///
/// The chain order is fixed, outermost first: chain-id validation, sender,
/// accounts, gas price, gas, Ganache compensation, transport. Only layers
/// the configuration asks for are inserted; "auto" layers are inserted by
/// default.
///
/// Local signers resolve missing gas fields through the layers below them,
/// so with `gas: "auto"` the signer itself applies the configured
/// multiplier to its estimations.
pub fn wrap_provider(
    base: Box<dyn EthereumProvider>,
    config: &NetworkConfig,
) -> Result<Box<dyn EthereumProvider>> {
    let mut provider: Box<dyn EthereumProvider> =
        Box::new(GanacheGasMultiplierProvider::new(base));

    provider = match config.gas {
        GasConfig::Auto => Box::new(AutomaticGasProvider::new(provider, config.gas_multiplier)),
        GasConfig::Fixed(gas) => Box::new(FixedGasProvider::new(provider, gas)),
    };
    provider = match config.gas_price {
        GasConfig::Auto => Box::new(AutomaticGasPriceProvider::new(provider)),
        GasConfig::Fixed(gas_price) => Box::new(FixedGasPriceProvider::new(provider, gas_price)),
    };
    provider = match &config.accounts {
        None => provider,
        Some(accounts) => {
            let signer = match accounts {
                AccountsConfig::Local(keys) => LocalAccountsProvider::new(provider, keys)?,
                AccountsConfig::Hd(hd) => LocalAccountsProvider::hd_wallet(
                    provider,
                    &hd.mnemonic,
                    hd.initial_index,
                    hd.count,
                    &hd.path,
                )?,
            };
            match config.gas {
                GasConfig::Auto => Box::new(signer.gas_multiplier(
                    config.gas_multiplier.unwrap_or(DEFAULT_GAS_MULTIPLIER),
                )),
                GasConfig::Fixed(_) => Box::new(signer),
            }
        }
    };
    provider = match &config.from {
        Some(from) => Box::new(FixedSenderProvider::new(provider, from.clone())),
        None => Box::new(AutomaticSenderProvider::new(provider)),
    };
    if let Some(chain_id) = config.chain_id {
        provider = Box::new(ChainIdValidatorProvider::new(provider, chain_id));
    }
    Ok(provider)
}

/// Builds the HTTP transport for the configured url and wraps it.
pub fn create_provider(config: &NetworkConfig) -> Result<Box<dyn EthereumProvider>> {
    let base = Box::new(HttpProvider::new(Url::parse(&config.url)?));
    wrap_provider(base, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::ProviderError,
        gas::{DEFAULT_GAS_MULTIPLIER, GANACHE_GAS_MULTIPLIER},
        mock::MockProvider,
        util,
    };
    use serde_json::json;

    const KEYS: [&str; 3] = [
        "0x5ca14ebaee5e4a48b5341d9225f856115be72df55c7621b73fb0b6a1fdefcf24",
        "0x4e24948ea2bbd95ccd2bac641aadf36acd7e7cc011b1186a83dfe8db6cc7b1ae",
        "0x6dca0836dc90c159b9240aeff471441a134e1b215a7ffe9d69d335f325932665",
    ];

    fn config(url: &str) -> NetworkConfig {
        NetworkConfig {
            url: url.to_string(),
            chain_id: None,
            from: None,
            gas: GasConfig::Auto,
            gas_price: GasConfig::Auto,
            gas_multiplier: None,
            accounts: None,
        }
    }

    fn signing_mock() -> MockProvider {
        let mock = MockProvider::new();
        mock.respond_to("eth_chainId", json!("0x1"));
        mock.respond_to("eth_getTransactionCount", json!("0x0"));
        mock.respond_to("eth_gasPrice", json!("0x3b9aca00"));
        mock.respond_to("eth_estimateGas", json!("0x5208"));
        mock.respond_to("eth_sendRawTransaction", json!("0xtxhash"));
        mock
    }

    /// Decodes the gas field out of the raw transaction the mock received.
    fn signed_transaction_gas(mock: &MockProvider) -> u128 {
        let raw = mock
            .requests()
            .into_iter()
            .find(|(method, _)| method == "eth_sendRawTransaction")
            .map(|(_, params)| params[0].as_str().unwrap().to_string())
            .unwrap();
        let raw = hex::decode(raw.trim_start_matches("0x")).unwrap();
        // nonce, gas price, gas, to, value, data, v, r, s
        let gas = rlp::Rlp::new(&raw).at(2).unwrap().data().unwrap().to_vec();
        gas.iter().fold(0, |gas, byte| (gas << 8) | u128::from(*byte))
    }

    #[test]
    fn config_deserializes_the_network_shape() {
        let config: NetworkConfig = serde_json::from_value(json!({
            "url": "http://localhost:8545",
            "chainId": 31337,
            "gas": "auto",
            "gasPrice": 8000000000u64,
            "gasMultiplier": 1.337,
            "accounts": {
                "mnemonic": "test test test test test test test test test test test junk",
                "initialIndex": 1,
            }
        }))
        .unwrap();

        assert_eq!(config.chain_id, Some(31337));
        assert_eq!(config.gas, GasConfig::Auto);
        assert_eq!(config.gas_price, GasConfig::Fixed(8_000_000_000));
        match config.accounts {
            Some(AccountsConfig::Hd(hd)) => {
                assert_eq!(hd.initial_index, 1);
                assert_eq!(hd.count, 20);
                assert_eq!(hd.path, DEFAULT_DERIVATION_PATH_PREFIX);
            }
            other => panic!("unexpected accounts config: {other:?}"),
        }

        let config: NetworkConfig =
            serde_json::from_value(json!({ "url": "", "accounts": ["0xaa"] })).unwrap();
        assert!(matches!(config.accounts, Some(AccountsConfig::Local(_))));
    }

    #[tokio::test]
    async fn wraps_with_local_accounts() {
        let mut config = config("");
        config.accounts =
            Some(AccountsConfig::Local(KEYS.iter().map(|k| k.to_string()).collect()));
        let provider = wrap_provider(Box::new(MockProvider::new()), &config).unwrap();

        let accounts = provider.send("eth_accounts", Vec::new()).await.unwrap();
        assert_eq!(
            accounts,
            json!([
                "0x04397ae3f38106cebdf03f963074ecfc23d509d9",
                "0xa2b6816c50d49101901d93f5302a3a57e0a1281b",
                "0x56b33dc9bd2d34aa087b982f4e307145156f5f9f",
            ])
        );
    }

    #[tokio::test]
    async fn wraps_with_an_hd_wallet() {
        let mut config = config("");
        config.accounts = Some(AccountsConfig::Hd(HdAccountsConfig {
            mnemonic:
                "hurdle method ceiling design federal record unfair cloud end midnight corn oval"
                    .to_string(),
            initial_index: 3,
            count: 2,
            path: DEFAULT_DERIVATION_PATH_PREFIX.to_string(),
        }));
        let provider = wrap_provider(Box::new(MockProvider::new()), &config).unwrap();

        let accounts = provider.send("eth_accounts", Vec::new()).await.unwrap();
        assert_eq!(
            accounts,
            json!([
                "0xd26a6f43b0df5c539778e08feec29908ea83a1c1",
                "0x70afc7acf880e0d233e8ebedadbdaf68984ff510",
            ])
        );
    }

    #[tokio::test]
    async fn remote_accounts_pass_through() {
        let provider = wrap_provider(Box::new(MockProvider::new()), &config("")).unwrap();

        let accounts = provider
            .send("eth_accounts", vec![json!("param1"), json!("param2")])
            .await
            .unwrap();
        assert_eq!(accounts, json!(["param1", "param2"]));
    }

    #[tokio::test]
    async fn fixed_sender_reaches_the_signer() {
        let mock = signing_mock();
        let mut config = config("");
        config.from = Some("0xa2b6816c50d49101901d93f5302a3a57e0a1281b".to_string());
        config.accounts =
            Some(AccountsConfig::Local(KEYS.iter().map(|k| k.to_string()).collect()));
        let provider = wrap_provider(Box::new(mock.clone()), &config).unwrap();

        provider.send("eth_sendTransaction", vec![json!({})]).await.unwrap();

        // the injected sender is the account the signer looked up the nonce for
        let nonce_query = mock
            .requests()
            .into_iter()
            .find(|(method, _)| method == "eth_getTransactionCount")
            .unwrap();
        assert_eq!(nonce_query.1[0], json!("0xa2b6816c50d49101901d93f5302a3a57e0a1281b"));
        assert!(mock.requests().iter().any(|(method, _)| method == "eth_sendRawTransaction"));
    }

    #[tokio::test]
    async fn default_sender_is_the_first_account() {
        let mock = signing_mock();
        let mut config = config("");
        config.accounts =
            Some(AccountsConfig::Local(KEYS.iter().map(|k| k.to_string()).collect()));
        let provider = wrap_provider(Box::new(mock.clone()), &config).unwrap();

        provider.send("eth_sendTransaction", vec![json!({})]).await.unwrap();

        let nonce_query = mock
            .requests()
            .into_iter()
            .find(|(method, _)| method == "eth_getTransactionCount")
            .unwrap();
        assert_eq!(nonce_query.1[0], json!("0x04397ae3f38106cebdf03f963074ecfc23d509d9"));
    }

    #[tokio::test]
    async fn automatic_gas_applies_through_the_whole_chain() {
        let mock = MockProvider::new();
        mock.respond_to("eth_gasPrice", json!("0x1"));
        let base = Box::new(FixedGasProvider::new(mock, 123));

        let provider = wrap_provider(base, &config("")).unwrap();
        let result = provider
            .send(
                "eth_sendTransaction",
                vec![json!({ "from": "0x0000000000000000000000000000000000000011" })],
            )
            .await
            .unwrap();

        let gas = util::quantity_to_u128(&result[0]["gas"]).unwrap();
        assert_eq!(gas, (123.0 * DEFAULT_GAS_MULTIPLIER) as u128);
    }

    #[tokio::test]
    async fn local_signer_applies_the_default_gas_multiplier() {
        let mock = signing_mock();
        let mut config = config("");
        config.accounts = Some(AccountsConfig::Local(vec![KEYS[0].to_string()]));
        let provider = wrap_provider(Box::new(mock.clone()), &config).unwrap();

        provider.send("eth_sendTransaction", vec![json!({})]).await.unwrap();

        // the raw payload carries the multiplied estimation, 21000 * 1.25
        assert_eq!(signed_transaction_gas(&mock), 26250);
    }

    #[tokio::test]
    async fn local_signer_honors_a_configured_gas_multiplier() {
        let mock = signing_mock();
        let mut config = config("");
        config.gas_multiplier = Some(2.0);
        config.accounts = Some(AccountsConfig::Local(vec![KEYS[0].to_string()]));
        let provider = wrap_provider(Box::new(mock.clone()), &config).unwrap();

        provider.send("eth_sendTransaction", vec![json!({})]).await.unwrap();

        assert_eq!(signed_transaction_gas(&mock), 42000);
    }

    #[tokio::test]
    async fn local_signer_takes_fixed_gas_unmultiplied() {
        let mock = signing_mock();
        let mut config = config("");
        config.gas = GasConfig::Fixed(30000);
        config.gas_multiplier = Some(2.0);
        config.accounts = Some(AccountsConfig::Local(vec![KEYS[0].to_string()]));
        let provider = wrap_provider(Box::new(mock.clone()), &config).unwrap();

        provider.send("eth_sendTransaction", vec![json!({})]).await.unwrap();

        assert_eq!(signed_transaction_gas(&mock), 30000);
    }

    #[tokio::test]
    async fn ganache_quirk_applies_through_the_whole_chain() {
        let base = Box::new(FixedGasProvider::new(MockProvider::ganache(), 123));
        let provider = wrap_provider(base, &config("")).unwrap();

        let estimation = provider
            .send(
                "eth_estimateGas",
                vec![json!({ "to": "0xa2b6816c50d49101901d93f5302a3a57e0a1281b", "value": 1 })],
            )
            .await
            .unwrap();
        assert_eq!(
            util::quantity_to_u128(&estimation).unwrap(),
            (123.0 * GANACHE_GAS_MULTIPLIER) as u128
        );
    }

    #[tokio::test]
    async fn configured_chain_id_is_enforced() {
        let mock = MockProvider::new();
        mock.respond_to("eth_chainId", json!("0x1"));
        let mut config = config("");
        config.chain_id = Some(2);
        let provider = wrap_provider(Box::new(mock), &config).unwrap();

        for _ in 0..2 {
            let err = provider.send("eth_getAccounts", Vec::new()).await.unwrap_err();
            assert!(matches!(err, ProviderError::InvalidChainId { configured: 2, connected: 1 }));
        }
    }
}
