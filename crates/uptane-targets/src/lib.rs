//! Streaming verifier for Uptane Director Targets metadata
//!
//! An ECU in the Uptane update framework receives a signed JSON document from
//! the Director naming the one firmware image it must install, identified by
//! SHA-512 digest and byte length. This crate verifies such a document as it
//! arrives, in constant memory, without ever buffering the whole thing.
//!
//! # Architecture
//!
//! The verifier is four cooperating layers, driven strictly in document
//! order:
//!
//! - **Byte source** ([`ByteSource`]): pull bytes from a slice, a reader, or
//!   any transport the caller adapts.
//! - **Tee**: while the parser is inside the `signed` value, every consumed
//!   byte is also fed to each live signature context, exactly once.
//! - **Grammar walker** ([`TargetsVerifier`]): a lockstep recursive-descent
//!   parse of the fixed, whitespace-free document shape the Director emits.
//! - **Verification pipeline**: one slot per trusted key; after the signed
//!   value closes, every armed context produces an independent verdict and
//!   the accept count is measured against the threshold.
//!
//! # Example
//!
//! ```rust,ignore
//! use uptane_targets::{SliceSource, TargetsVerifier, Verdict, VerifierConfig};
//!
//! let verifier = TargetsVerifier::new(
//!     VerifierConfig {
//!         keys: &keys,
//!         threshold: 1,
//!         ecu_id: b"front-brake-ecu",
//!         hardware_id: b"bcm-rev2",
//!         now,
//!         version_prev: 5,
//!     },
//!     SliceSource::new(&document),
//! )?;
//!
//! match verifier.process()? {
//!     Verdict::Update(image) => install(image.sha512, image.length),
//!     Verdict::NoUpdate { .. } => {}
//!     Verdict::NoImage => {}
//! }
//! ```

pub mod crypto;
pub mod error;
pub mod keys;
mod pipeline;
pub mod pool;
pub mod source;
pub mod time;
pub mod verifier;

pub use crypto::{
    method_supported, SignatureMethod, StreamVerifier, TrustedKey, KEYID_LEN, PUBLIC_KEY_LEN,
    SIG_LEN,
};
pub use error::{ConfigError, ErrorClass, TargetsError};
pub use keys::{keys_from_json, KeyParseError};
pub use pool::{PooledScratch, ScratchPool, VerifierScratch};
pub use source::{ByteSource, IoSource, SliceSource};
pub use time::UtcTime;
pub use verifier::{TargetImage, TargetsVerifier, Verdict, VerifierConfig};

/// Maximum number of entries accepted in the `signatures` array, and the
/// maximum number of trusted keys a verifier can be configured with.
pub const MAX_SIGS: usize = 8;

/// Parse scratch size. Bounds every variable-width field the walker keeps
/// (method names, ECU and hardware identifiers, hash algorithm names);
/// target paths are skipped and may be arbitrarily long.
pub const BUF_SIZE: usize = 128;

/// Size of the one supported image digest (SHA-512).
pub const SHA512_LEN: usize = 64;
