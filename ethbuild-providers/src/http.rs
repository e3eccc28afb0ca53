//! A minimal HTTP JSON-RPC 2.0 transport.

use std::{
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{
    errors::{JsonRpcError, ProviderError, Result},
    EthereumProvider,
};

/// A JSON-RPC provider over HTTP.
///
/// Request ids are unique per instance, not globally.
#[derive(Debug)]
pub struct HttpProvider {
    id: AtomicU64,
    client: reqwest::Client,
    url: Url,
}

impl HttpProvider {
    pub fn new(url: Url) -> Self {
        Self { id: AtomicU64::new(0), client: reqwest::Client::new(), url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl FromStr for HttpProvider {
    type Err = ProviderError;

    fn from_str(src: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(src)?))
    }
}

impl Clone for HttpProvider {
    fn clone(&self) -> Self {
        Self { id: AtomicU64::new(0), client: self.client.clone(), url: self.url.clone() }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    jsonrpc: &'a str,
    method: &'a str,
    params: &'a [Value],
}

#[derive(Deserialize)]
struct Response {
    #[allow(dead_code)]
    id: u64,
    #[serde(flatten)]
    data: ResponseData,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseData {
    Error { error: JsonRpcError },
    Success { result: Value },
}

#[async_trait]
impl EthereumProvider for HttpProvider {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let id = self.id.fetch_add(1, Ordering::SeqCst);
        let payload = Request { id, jsonrpc: "2.0", method, params: &params };

        tracing::trace!(method, id, "sending request");
        let response: Response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        match response.data {
            ResponseData::Success { result } => Ok(result),
            ResponseData::Error { error } => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_both_shapes() {
        let response: Response =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#).unwrap();
        assert!(matches!(response.data, ResponseData::Success { .. }));

        let response: Response = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"method not found"}}"#,
        )
        .unwrap();
        match response.data {
            ResponseData::Error { error } => assert_eq!(error.code, -32601),
            _ => panic!("expected an error response"),
        }
    }
}
