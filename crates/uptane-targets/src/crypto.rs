//! Trusted keys and streaming signature verification.
//!
//! Signatures cover the exact serialized bytes of the document's `signed`
//! value, which on a small device cannot be buffered whole. Verification is
//! therefore Ed25519ph: the signed bytes are folded into a SHA-512 context
//! as the parser consumes them, and the signature is checked over the final
//! digest once the signed value closes.

use std::fmt;

use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha256, Sha512};

/// Key identifier width: a SHA-256 digest of the raw public key.
pub const KEYID_LEN: usize = 32;

/// Raw Ed25519 public key width.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Maximum signature width; Ed25519 signatures use all of it.
pub const SIG_LEN: usize = 64;

/// Signature methods this build can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    /// Ed25519ph over the signed bytes.
    Ed25519,
}

impl SignatureMethod {
    /// Resolves a wire method name, `None` when unsupported.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        (name == b"ed25519").then_some(SignatureMethod::Ed25519)
    }

    /// The wire name of this method.
    pub fn name(&self) -> &'static str {
        match self {
            SignatureMethod::Ed25519 => "ed25519",
        }
    }
}

/// Returns true when `name` names a signature method this build can verify.
pub fn method_supported(name: &[u8]) -> bool {
    SignatureMethod::from_name(name).is_some()
}

/// A key the Director is trusted to sign Targets metadata with.
#[derive(Debug, Clone)]
pub struct TrustedKey {
    /// Identifier the document's signature entries are matched against.
    pub keyid: [u8; KEYID_LEN],
    /// Signature method this key is used with.
    pub method: SignatureMethod,
    /// The public key material.
    pub public: VerifyingKey,
}

impl TrustedKey {
    /// Builds a trusted Ed25519 key under an explicit identifier.
    pub fn ed25519(keyid: [u8; KEYID_LEN], public: VerifyingKey) -> Self {
        TrustedKey {
            keyid,
            method: SignatureMethod::Ed25519,
            public,
        }
    }

    /// Derives the conventional identifier for a public key: the SHA-256
    /// digest of its raw bytes.
    pub fn keyid_for(public: &VerifyingKey) -> [u8; KEYID_LEN] {
        let digest = Sha256::digest(public.as_bytes());
        digest.into()
    }
}

/// Live verification context for one signature slot.
///
/// Created when the document presents a signature under a trusted key, fed
/// every signed byte in consumption order, and consumed by [`finish`] once
/// the signed value closes.
///
/// [`finish`]: StreamVerifier::finish
#[derive(Clone)]
pub struct StreamVerifier {
    public: VerifyingKey,
    hasher: Sha512,
}

impl StreamVerifier {
    /// Arms a context for `key`.
    pub fn new(key: &TrustedKey) -> Self {
        StreamVerifier {
            public: key.public,
            hasher: Sha512::new(),
        }
    }

    /// Folds consumed signed bytes into the context.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Checks `sig` over everything fed so far.
    ///
    /// A malformed signature (wrong width, invalid encoding) is a reject,
    /// not an error; each slot's verdict is independent.
    pub fn finish(self, sig: &[u8]) -> bool {
        let Ok(sig) = Signature::from_slice(sig) else {
            return false;
        };
        self.public.verify_prehashed(self.hasher, None, &sig).is_ok()
    }
}

impl fmt::Debug for StreamVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamVerifier").finish_non_exhaustive()
    }
}
