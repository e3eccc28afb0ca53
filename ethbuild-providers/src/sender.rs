//! Default-sender middlewares, filling a missing `from` on outgoing calls.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{errors::Result, util, EthereumProvider};

const SENDING_METHODS: [&str; 2] = ["eth_sendTransaction", "eth_call"];

/// Fills a missing `from` with a configured address.
#[derive(Debug)]
pub struct FixedSenderProvider<P> {
    inner: P,
    from: String,
}

impl<P: EthereumProvider> FixedSenderProvider<P> {
    pub fn new(inner: P, from: impl Into<String>) -> Self {
        Self { inner, from: from.into() }
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for FixedSenderProvider<P> {
    async fn send(&self, method: &str, mut params: Vec<Value>) -> Result<Value> {
        if SENDING_METHODS.contains(&method) {
            if let Some(tx) = util::transaction_object(&mut params) {
                tx.entry("from").or_insert_with(|| Value::String(self.from.clone()));
            }
        }
        self.inner.send(method, params).await
    }
}

/// Fills a missing `from` with the first account the inner provider reports.
///
/// `eth_accounts` is asked once and the answer cached; a node with no
/// accounts leaves the field absent for a deeper layer (or the node itself)
/// to resolve.
#[derive(Debug)]
pub struct AutomaticSenderProvider<P> {
    inner: P,
    from: OnceCell<Option<String>>,
}

impl<P: EthereumProvider> AutomaticSenderProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner, from: OnceCell::new() }
    }

    async fn default_sender(&self) -> Result<Option<String>> {
        let from = self
            .from
            .get_or_try_init(|| async {
                let accounts = self.inner.send("eth_accounts", Vec::new()).await?;
                Ok::<_, crate::errors::ProviderError>(
                    accounts
                        .as_array()
                        .and_then(|accounts| accounts.first())
                        .and_then(Value::as_str)
                        .map(str::to_string),
                )
            })
            .await?;
        Ok(from.clone())
    }
}

#[async_trait]
impl<P: EthereumProvider> EthereumProvider for AutomaticSenderProvider<P> {
    async fn send(&self, method: &str, mut params: Vec<Value>) -> Result<Value> {
        if SENDING_METHODS.contains(&method) {
            let needs_from = util::transaction_object(&mut params)
                .map(|tx| !tx.contains_key("from"))
                .unwrap_or_default();
            if needs_from {
                if let Some(from) = self.default_sender().await? {
                    if let Some(tx) = util::transaction_object(&mut params) {
                        tx.insert("from".to_string(), Value::String(from));
                    }
                }
            }
        }
        self.inner.send(method, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use serde_json::json;

    #[tokio::test]
    async fn fixed_sender_fills_only_missing_from() {
        let provider = FixedSenderProvider::new(
            MockProvider::new(),
            "0xa2b6816c50d49101901d93f5302a3a57e0a1281b",
        );

        let result = provider.send("eth_sendTransaction", vec![json!({})]).await.unwrap();
        assert_eq!(result[0]["from"], json!("0xa2b6816c50d49101901d93f5302a3a57e0a1281b"));

        let result = provider
            .send("eth_call", vec![json!({ "from": "0x0000000000000000000000000000000000000011" })])
            .await
            .unwrap();
        assert_eq!(result[0]["from"], json!("0x0000000000000000000000000000000000000011"));

        // unrelated methods are untouched
        let result = provider.send("eth_getBalance", vec![json!({})]).await.unwrap();
        assert_eq!(result, json!([{}]));
    }

    #[tokio::test]
    async fn automatic_sender_asks_the_node_once() {
        let mock = MockProvider::new();
        mock.respond_to(
            "eth_accounts",
            json!(["0x04397ae3f38106cebdf03f963074ecfc23d509d9"]),
        );
        let provider = AutomaticSenderProvider::new(mock.clone());

        for _ in 0..2 {
            let result = provider.send("eth_sendTransaction", vec![json!({})]).await.unwrap();
            assert_eq!(result[0]["from"], json!("0x04397ae3f38106cebdf03f963074ecfc23d509d9"));
        }

        let probes =
            mock.requests().into_iter().filter(|(method, _)| method == "eth_accounts").count();
        assert_eq!(probes, 1);
    }

    #[tokio::test]
    async fn automatic_sender_tolerates_account_less_nodes() {
        let mock = MockProvider::new();
        mock.respond_to("eth_accounts", json!([]));
        let provider = AutomaticSenderProvider::new(mock);

        let result = provider.send("eth_sendTransaction", vec![json!({})]).await.unwrap();
        assert_eq!(result, json!([{}]));
    }
}
