//! Signature slots for threshold verification.
//!
//! One slot exists per configured trusted key. A slot is armed when the
//! document presents a signature under that key, receives every signed byte
//! exactly once while armed, and yields an independent verdict at
//! finalization. The pipeline never short-circuits: all verdicts are
//! computed so a partially-forged signature set is still measured against
//! the threshold.

use crate::crypto::{StreamVerifier, TrustedKey, SIG_LEN};

/// One signature slot, parallel to one trusted key.
#[derive(Debug, Clone)]
pub(crate) struct SigSlot {
    /// Decoded signature bytes from the document.
    pub sig: [u8; SIG_LEN],
    /// How much of `sig` the document filled.
    pub sig_len: usize,
    /// Live verify context; `Some` iff the slot is armed.
    pub verify: Option<StreamVerifier>,
}

impl SigSlot {
    pub(crate) fn new() -> Self {
        SigSlot {
            sig: [0u8; SIG_LEN],
            sig_len: 0,
            verify: None,
        }
    }

    /// True once the document has presented a signature for this slot's key.
    pub(crate) fn is_armed(&self) -> bool {
        self.verify.is_some()
    }

    /// Stores the signature bytes and arms a verify context for `key`.
    pub(crate) fn arm(&mut self, key: &TrustedKey, sig: &[u8]) {
        self.sig[..sig.len()].copy_from_slice(sig);
        self.sig_len = sig.len();
        self.verify = Some(StreamVerifier::new(key));
    }

    pub(crate) fn reset(&mut self) {
        self.sig_len = 0;
        self.verify = None;
    }
}

/// Index of the trusted key matching `keyid`, if any.
pub(crate) fn lookup_key(keys: &[TrustedKey], keyid: &[u8]) -> Option<usize> {
    keys.iter().position(|key| key.keyid == keyid)
}

/// Forwards consumed signed bytes to every armed slot.
pub(crate) fn feed(slots: &mut [SigSlot], bytes: &[u8]) {
    for slot in slots.iter_mut() {
        if let Some(verify) = slot.verify.as_mut() {
            verify.feed(bytes);
        }
    }
}

/// Finalizes every armed slot and returns the count of valid signatures.
pub(crate) fn finalize(slots: &mut [SigSlot]) -> u32 {
    let mut valid = 0;
    for slot in slots.iter_mut() {
        if let Some(verify) = slot.verify.take() {
            if verify.finish(&slot.sig[..slot.sig_len]) {
                valid += 1;
            }
        }
    }
    valid
}
