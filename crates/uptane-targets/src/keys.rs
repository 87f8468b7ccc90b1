//! Trusted-key-set loading.
//!
//! The key store itself lives outside this crate; what arrives here is its
//! interchange form, a JSON document listing the Director Targets-role keys:
//!
//! ```json
//! {
//!   "keys": [
//!     {"keyid": "<hex>", "method": "ed25519", "public": "<hex or base64>"}
//!   ]
//! }
//! ```
//!
//! Key material accepts hex or base64, with an optional `ed25519:` prefix.
//! When `keyid` is omitted it is derived as the SHA-256 of the public key.

use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::crypto::{SignatureMethod, TrustedKey, KEYID_LEN, PUBLIC_KEY_LEN};

/// Failures loading a trusted-key set.
#[derive(Debug, Error)]
pub enum KeyParseError {
    /// The document was not valid JSON of the expected shape.
    #[error("invalid key set document: {0}")]
    Json(#[from] serde_json::Error),

    /// A key named a method this build cannot verify.
    #[error("unsupported signature method: {0}")]
    UnsupportedMethod(String),

    /// A keyid did not decode to the expected width.
    #[error("invalid keyid: {0}")]
    InvalidKeyId(String),

    /// Public key material did not decode to a usable Ed25519 key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

#[derive(Deserialize)]
struct KeySetJson {
    keys: Vec<KeyJson>,
}

#[derive(Deserialize)]
struct KeyJson {
    #[serde(default)]
    keyid: Option<String>,
    method: String,
    public: String,
}

/// Loads a trusted-key set from its JSON interchange form.
pub fn keys_from_json(json: &str) -> Result<Vec<TrustedKey>, KeyParseError> {
    let parsed: KeySetJson = serde_json::from_str(json)?;

    let mut keys = Vec::with_capacity(parsed.keys.len());
    for entry in parsed.keys {
        if SignatureMethod::from_name(entry.method.as_bytes()).is_none() {
            return Err(KeyParseError::UnsupportedMethod(entry.method));
        }

        let public = decode_public(&entry.public)?;
        let keyid = match entry.keyid {
            Some(hex) => decode_keyid(&hex)?,
            None => TrustedKey::keyid_for(&public),
        };
        keys.push(TrustedKey::ed25519(keyid, public));
    }

    debug!(count = keys.len(), "loaded trusted key set");
    Ok(keys)
}

/// Decodes `ed25519:`-prefixed hex or base64 material into raw bytes.
fn decode_material(encoded: &str) -> Option<Vec<u8>> {
    let encoded = encoded.strip_prefix("ed25519:").unwrap_or(encoded);
    if let Ok(bytes) = hex::decode(encoded) {
        return Some(bytes);
    }
    use base64::{engine::general_purpose::STANDARD, Engine};
    STANDARD.decode(encoded).ok()
}

fn decode_public(encoded: &str) -> Result<VerifyingKey, KeyParseError> {
    let bytes = decode_material(encoded)
        .ok_or_else(|| KeyParseError::InvalidPublicKey(format!("undecodable: {encoded}")))?;

    if bytes.len() != PUBLIC_KEY_LEN {
        return Err(KeyParseError::InvalidPublicKey(format!(
            "expected {PUBLIC_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let mut raw = [0u8; PUBLIC_KEY_LEN];
    raw.copy_from_slice(&bytes);

    VerifyingKey::from_bytes(&raw).map_err(|e| KeyParseError::InvalidPublicKey(e.to_string()))
}

fn decode_keyid(encoded: &str) -> Result<[u8; KEYID_LEN], KeyParseError> {
    let bytes = hex::decode(encoded)
        .map_err(|e| KeyParseError::InvalidKeyId(format!("{encoded}: {e}")))?;
    if bytes.len() != KEYID_LEN {
        return Err(KeyParseError::InvalidKeyId(format!(
            "expected {KEYID_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let mut keyid = [0u8; KEYID_LEN];
    keyid.copy_from_slice(&bytes);
    Ok(keyid)
}
