//! Legacy (EIP-155) transaction representation and local signing.

use std::{fmt, str::FromStr};

use k256::{
    ecdsa::{recoverable, signature::DigestSigner, SigningKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use rlp::RlpStream;
use serde_json::Value;
use sha3::{Digest, Keccak256};

use crate::{
    errors::{ProviderError, Result},
    util,
};

/// A 20-byte Ethereum address, displayed as lowercase `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = ProviderError;

    fn from_str(src: &str) -> Result<Self> {
        let digits = src.strip_prefix("0x").unwrap_or(src);
        let bytes = hex::decode(digits)?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ProviderError::custom(format!("invalid address: {src}")))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Derives the address of the key: `keccak256(uncompressed_pubkey)[12..]`.
pub fn secret_key_to_address(key: &SigningKey) -> Address {
    let public_key = key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&public_key.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address(bytes)
}

/// A legacy transaction, the shape `eth_sendTransaction` carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub nonce: Option<u64>,
    pub gas: Option<u128>,
    pub gas_price: Option<u128>,
    pub value: Option<u128>,
    pub data: Option<Vec<u8>>,
}

/// An ECDSA signature with the EIP-155 encoded recovery id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl TransactionRequest {
    /// Parses the JSON transaction object. Quantities are accepted both as
    /// hex strings and as bare integers; unknown fields are ignored.
    pub fn from_value(tx: &Value) -> Result<Self> {
        let obj = tx
            .as_object()
            .ok_or_else(|| ProviderError::custom("transaction must be an object"))?;

        let address = |field: &str| -> Result<Option<Address>> {
            match obj.get(field) {
                Some(Value::String(s)) => Ok(Some(s.parse()?)),
                Some(other) => {
                    Err(ProviderError::custom(format!("invalid {field} address: {other}")))
                }
                None => Ok(None),
            }
        };
        let quantity = |field: &str| -> Result<Option<u128>> {
            obj.get(field).map(util::quantity_to_u128).transpose()
        };

        let data = match obj.get("data") {
            Some(Value::String(s)) => Some(hex::decode(s.strip_prefix("0x").unwrap_or(s))?),
            _ => None,
        };

        Ok(Self {
            from: address("from")?,
            to: address("to")?,
            nonce: quantity("nonce")?.map(|n| n as u64),
            gas: quantity("gas")?,
            gas_price: quantity("gasPrice")?,
            value: quantity("value")?,
            data,
        })
    }

    /// The JSON object form, hex-quantity encoded, omitting unset fields.
    pub fn to_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        if let Some(from) = &self.from {
            obj.insert("from".to_string(), Value::String(from.to_string()));
        }
        if let Some(to) = &self.to {
            obj.insert("to".to_string(), Value::String(to.to_string()));
        }
        if let Some(nonce) = self.nonce {
            obj.insert("nonce".to_string(), Value::String(util::to_quantity(nonce.into())));
        }
        if let Some(gas) = self.gas {
            obj.insert("gas".to_string(), Value::String(util::to_quantity(gas)));
        }
        if let Some(gas_price) = self.gas_price {
            obj.insert("gasPrice".to_string(), Value::String(util::to_quantity(gas_price)));
        }
        if let Some(value) = self.value {
            obj.insert("value".to_string(), Value::String(util::to_quantity(value)));
        }
        if let Some(data) = &self.data {
            obj.insert("data".to_string(), Value::String(format!("0x{}", hex::encode(data))));
        }
        Value::Object(obj)
    }

    /// Appends the six legacy payload fields
    fn rlp_base(&self, rlp: &mut RlpStream) {
        append_quantity(rlp, self.nonce.unwrap_or_default().into());
        append_quantity(rlp, self.gas_price.unwrap_or_default());
        append_quantity(rlp, self.gas.unwrap_or_default());
        match &self.to {
            Some(to) => {
                let bytes: &[u8] = to.as_bytes();
                rlp.append(&bytes);
            }
            None => {
                rlp.append_empty_data();
            }
        }
        append_quantity(rlp, self.value.unwrap_or_default());
        rlp.append(&self.data.clone().unwrap_or_default());
    }

    fn rlp_unsigned(&self, chain_id: u64) -> Vec<u8> {
        let mut rlp = RlpStream::new();
        rlp.begin_list(9);
        self.rlp_base(&mut rlp);
        // EIP-155: (chain_id, 0, 0) in place of the signature
        append_quantity(&mut rlp, chain_id.into());
        rlp.append_empty_data();
        rlp.append_empty_data();
        rlp.out().to_vec()
    }

    /// The EIP-155 signing hash.
    pub fn sighash(&self, chain_id: u64) -> [u8; 32] {
        Keccak256::digest(self.rlp_unsigned(chain_id)).into()
    }

    /// Signs with the replay-protected recovery id,
    /// `v = chain_id * 2 + 35 + recovery_id`.
    pub fn sign(&self, key: &SigningKey, chain_id: u64) -> Result<Signature> {
        let digest = Keccak256::new_with_prefix(self.rlp_unsigned(chain_id));
        let signature: recoverable::Signature = key.try_sign_digest(digest)?;

        let v = chain_id * 2 + 35 + u64::from(u8::from(signature.recovery_id()));
        let r_bytes: k256::FieldBytes = signature.r().into();
        let s_bytes: k256::FieldBytes = signature.s().into();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);
        Ok(Signature { v, r, s })
    }

    /// The raw signed transaction, ready for `eth_sendRawTransaction`.
    pub fn rlp_signed(&self, signature: &Signature) -> Vec<u8> {
        let mut rlp = RlpStream::new();
        rlp.begin_list(9);
        self.rlp_base(&mut rlp);
        append_quantity(&mut rlp, signature.v.into());
        append_bytes(&mut rlp, &signature.r);
        append_bytes(&mut rlp, &signature.s);
        rlp.out().to_vec()
    }
}

/// Appends a quantity as its trimmed big-endian bytes; zero encodes as the
/// empty string.
fn append_quantity(rlp: &mut RlpStream, value: u128) {
    append_bytes(rlp, &value.to_be_bytes());
}

fn append_bytes(rlp: &mut RlpStream, bytes: &[u8]) {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let trimmed: &[u8] = &bytes[start..];
    rlp.append(&trimmed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(hex_key: &str) -> SigningKey {
        SigningKey::from_bytes(&hex::decode(hex_key).unwrap()).unwrap()
    }

    #[test]
    fn derives_known_addresses() {
        let fixtures = [
            (
                "5ca14ebaee5e4a48b5341d9225f856115be72df55c7621b73fb0b6a1fdefcf24",
                "0x04397ae3f38106cebdf03f963074ecfc23d509d9",
            ),
            (
                "4e24948ea2bbd95ccd2bac641aadf36acd7e7cc011b1186a83dfe8db6cc7b1ae",
                "0xa2b6816c50d49101901d93f5302a3a57e0a1281b",
            ),
            (
                "6dca0836dc90c159b9240aeff471441a134e1b215a7ffe9d69d335f325932665",
                "0x56b33dc9bd2d34aa087b982f4e307145156f5f9f",
            ),
        ];
        for (private_key, address) in fixtures {
            assert_eq!(secret_key_to_address(&key(private_key)).to_string(), address);
        }
    }

    #[test]
    fn parses_mixed_quantity_encodings() {
        let tx = TransactionRequest::from_value(&json!({
            "from": "0x04397ae3f38106cebdf03f963074ecfc23d509d9",
            "gas": 21000,
            "gasPrice": "0x3b9aca00",
            "value": 1,
            "data": "0xdeadbeef",
        }))
        .unwrap();
        assert_eq!(tx.gas, Some(21000));
        assert_eq!(tx.gas_price, Some(1_000_000_000));
        assert_eq!(tx.value, Some(1));
        assert_eq!(tx.data, Some(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(tx.to, None);
        assert_eq!(tx.nonce, None);
    }

    #[test]
    fn signature_v_encodes_the_chain_id() {
        let tx = TransactionRequest {
            to: "0xa2b6816c50d49101901d93f5302a3a57e0a1281b".parse().ok(),
            nonce: Some(0),
            gas: Some(21000),
            gas_price: Some(1),
            value: Some(1),
            ..Default::default()
        };
        let key = key("5ca14ebaee5e4a48b5341d9225f856115be72df55c7621b73fb0b6a1fdefcf24");
        let signature = tx.sign(&key, 1).unwrap();
        assert!(signature.v == 37 || signature.v == 38);

        let signature = tx.sign(&key, 31337).unwrap();
        assert!(signature.v == 31337 * 2 + 35 || signature.v == 31337 * 2 + 36);
    }

    #[test]
    fn signing_is_deterministic() {
        let tx = TransactionRequest {
            to: "0xa2b6816c50d49101901d93f5302a3a57e0a1281b".parse().ok(),
            nonce: Some(7),
            gas: Some(21000),
            gas_price: Some(1_000_000_000),
            ..Default::default()
        };
        let key = key("5ca14ebaee5e4a48b5341d9225f856115be72df55c7621b73fb0b6a1fdefcf24");
        let first = tx.sign(&key, 1).unwrap();
        let second = tx.sign(&key, 1).unwrap();
        assert_eq!(first, second);
        assert_eq!(tx.rlp_signed(&first), tx.rlp_signed(&second));
    }

    #[test]
    fn zero_quantities_encode_as_empty_strings() {
        let tx = TransactionRequest::default();
        let rlp = tx.rlp_unsigned(1);
        // list of nine items, eight empty strings and the chain id
        assert_eq!(rlp, vec![0xc9, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01, 0x80, 0x80]);
    }
}
