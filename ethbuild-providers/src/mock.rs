//! A scriptable in-memory transport for tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{errors::Result, EthereumProvider};

/// A provider that replays canned responses and otherwise echoes the request
/// params back as the result.
///
/// The echo default makes middleware injection directly observable: sending a
/// transaction through a chain of middlewares returns the transaction object
/// exactly as the innermost transport received it.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<HashMap<String, Value>>>,
    requests: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that identifies itself as Ganache.
    pub fn ganache() -> Self {
        let mock = Self::new();
        mock.respond_to(
            "web3_clientVersion",
            Value::String("EthereumJS TestRPC/v2.5.5/ethereum-js".to_string()),
        );
        mock
    }

    /// Registers a fixed response for a method.
    pub fn respond_to(&self, method: impl Into<String>, response: Value) {
        self.responses.lock().unwrap().insert(method.into(), response);
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<(String, Vec<Value>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EthereumProvider for MockProvider {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.requests.lock().unwrap().push((method.to_string(), params.clone()));
        if let Some(response) = self.responses.lock().unwrap().get(method) {
            return Ok(response.clone())
        }
        Ok(Value::Array(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn echoes_params_and_replays_canned_responses() {
        let mock = MockProvider::new();
        mock.respond_to("eth_gasPrice", json!("0x4d2"));

        assert_eq!(mock.send("eth_gasPrice", Vec::new()).await.unwrap(), json!("0x4d2"));
        assert_eq!(mock.send("other", vec![json!(1), json!(2)]).await.unwrap(), json!([1, 2]));
        assert_eq!(
            mock.requests(),
            vec![
                ("eth_gasPrice".to_string(), Vec::new()),
                ("other".to_string(), vec![json!(1), json!(2)])
            ]
        );
    }
}
