use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// A JSON-RPC 2.0 error
#[derive(Debug, Clone, Deserialize, Error)]
#[error("(code: {code}, message: {message}, data: {data:?})")]
pub struct JsonRpcError {
    /// The error code
    pub code: i64,
    /// The error message
    pub message: String,
    /// Additional data
    pub data: Option<serde_json::Value>,
}

/// An error thrown when making a call to the provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An error the remote node reported for the request
    #[error(transparent)]
    JsonRpc(#[from] JsonRpcError),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured chain id disagrees with the connected network.
    ///
    /// Raised per call, every call, for as long as the mismatch holds.
    #[error("invalid chain id: connected to {connected} but {configured} was configured")]
    InvalidChainId { configured: u64, connected: u64 },

    /// An explicit transaction sender that no local key manages
    #[error("unknown account {from}, it is not managed by this provider")]
    InvalidSender { from: String },

    /// A value that should be a QUANTITY (hex string or integer) but is not
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error(transparent)]
    Mnemonic(#[from] coins_bip39::MnemonicError),

    #[error(transparent)]
    Bip32(#[from] coins_bip32::Bip32Error),

    #[error(transparent)]
    Ecdsa(#[from] k256::ecdsa::Error),

    #[error("{0}")]
    Custom(String),
}

impl ProviderError {
    pub(crate) fn custom(msg: impl Into<String>) -> Self {
        ProviderError::Custom(msg.into())
    }
}
