//! Lockstep grammar walker over Director Targets metadata.
//!
//! The Director emits a canonical, whitespace-free document with a fixed
//! field order:
//!
//! ```text
//! {"signatures":[{"keyid":"<hex>","method":"<name>","sig":"<hex>"},...],
//!  "signed":{"_type":"Targets","expires":"YYYY-MM-DDTHH:MM:SSZ",
//!            "targets":{"<path>":{"custom":{...},"hashes":{...},"length":N},...},
//!            "version":N}}
//! ```
//!
//! The walker matches that shape byte for byte: fixed punctuation through
//! [`literal`], variable slots through the string/hex/integer/time
//! primitives. Everything funnels through one choke point so that, between
//! the opening `{` of the `signed` value and its matching `}` inclusive,
//! each consumed byte reaches every armed signature slot exactly once.
//! General JSON tolerance (reordering, whitespace, escapes) is deliberately
//! absent; a Director that emits anything else is a Director to distrust.
//!
//! [`literal`]: TargetsVerifier::literal

use crate::crypto::{method_supported, TrustedKey, KEYID_LEN, SIG_LEN};
use crate::error::{ConfigError, TargetsError};
use crate::pipeline;
use crate::pool::VerifierScratch;
use crate::source::ByteSource;
use crate::time::UtcTime;
use crate::{BUF_SIZE, MAX_SIGS, SHA512_LEN};

/// Longest fixed byte run the grammar matches in one step
/// (`:{"custom":{"ecu_identifier":`).
const MAX_LITERAL: usize = 32;

/// Inputs of one verification run. All borrows must outlive the verifier;
/// nothing is copied.
#[derive(Debug, Clone, Copy)]
pub struct VerifierConfig<'a> {
    /// Trusted Targets-role keys, at most [`MAX_SIGS`](crate::MAX_SIGS).
    pub keys: &'a [TrustedKey],
    /// Valid signatures required for acceptance.
    pub threshold: u32,
    /// This ECU's identity, matched against `ecu_identifier`.
    pub ecu_id: &'a [u8],
    /// This ECU's hardware model, matched against `hardware_identifier`.
    pub hardware_id: &'a [u8],
    /// Current wall-clock time for the expiry check.
    pub now: UtcTime,
    /// Version of the last accepted Targets document, 0 if none.
    pub version_prev: u32,
}

/// The firmware descriptor extracted for this ECU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetImage {
    /// SHA-512 digest of the image to install.
    pub sha512: [u8; SHA512_LEN],
    /// Image length in bytes.
    pub length: u32,
    /// Version of the document that named the image.
    pub version: u32,
}

/// Successful outcomes of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Fresh firmware is addressed to this ECU.
    Update(TargetImage),
    /// Valid document, but its version equals the last accepted one.
    NoUpdate {
        /// The (unchanged) document version.
        version: u32,
    },
    /// Valid document, but no target entry addressed this ECU.
    NoImage,
}

/// The matching target entry's fields, collected while its grammar parses.
struct MatchedEntry {
    sha512: Option<[u8; SHA512_LEN]>,
    length: u32,
}

/// Result of scanning the `targets` object. A duplicate match is recorded,
/// not returned on the spot: the downgrade predicate reads the `version`
/// field that follows the object and takes precedence.
struct TargetsScan {
    matched: Option<MatchedEntry>,
    duplicate: bool,
}

enum Scratch<'a> {
    Owned(Box<VerifierScratch>),
    Borrowed(&'a mut VerifierScratch),
}

impl Scratch<'_> {
    fn get(&mut self) -> &mut VerifierScratch {
        match self {
            Scratch::Owned(scratch) => scratch,
            Scratch::Borrowed(scratch) => scratch,
        }
    }
}

/// Single-use verification context over one document.
///
/// Construct, call [`process`] once, inspect the result. The context is
/// consumed by `process`; a new document needs a new context.
///
/// [`process`]: TargetsVerifier::process
pub struct TargetsVerifier<'a, S> {
    source: S,
    keys: &'a [TrustedKey],
    threshold: u32,
    ecu_id: &'a [u8],
    hardware_id: &'a [u8],
    now: UtcTime,
    version_prev: u32,
    scratch: Scratch<'a>,
    in_signed: bool,
}

impl<'a, S: ByteSource> TargetsVerifier<'a, S> {
    /// Builds a verifier with freshly allocated scratch (heap mode).
    pub fn new(config: VerifierConfig<'a>, source: S) -> Result<Self, ConfigError> {
        Self::build(config, source, Scratch::Owned(VerifierScratch::boxed()))
    }

    /// Builds a verifier over caller-provided scratch (pooled mode).
    ///
    /// The block is reset before use, so blocks may be reused across
    /// documents freely.
    pub fn with_scratch(
        config: VerifierConfig<'a>,
        source: S,
        scratch: &'a mut VerifierScratch,
    ) -> Result<Self, ConfigError> {
        Self::build(config, source, Scratch::Borrowed(scratch))
    }

    fn build(
        config: VerifierConfig<'a>,
        source: S,
        mut scratch: Scratch<'a>,
    ) -> Result<Self, ConfigError> {
        if config.keys.len() > MAX_SIGS {
            return Err(ConfigError::TooManyKeys {
                num_keys: config.keys.len(),
                max: MAX_SIGS,
            });
        }
        if config.threshold == 0 || config.threshold as usize > config.keys.len() {
            return Err(ConfigError::ThresholdOutOfRange {
                threshold: config.threshold,
                num_keys: config.keys.len(),
            });
        }

        scratch.get().reset();
        Ok(TargetsVerifier {
            source,
            keys: config.keys,
            threshold: config.threshold,
            ecu_id: config.ecu_id,
            hardware_id: config.hardware_id,
            now: config.now,
            version_prev: config.version_prev,
            scratch,
            in_signed: false,
        })
    }

    /// Walks the document from first byte to last and returns its verdict.
    ///
    /// Predicates fire in a fixed order: grammar failures dominate, then
    /// wrong role type, expiry, downgrade, duplicate ECU target, signature
    /// threshold, missing digest, and finally the success classification.
    /// Each later predicate presupposes the earlier ones held.
    pub fn process(mut self) -> Result<Verdict, TargetsError> {
        self.literal(b"{\"signatures\":[")?;
        self.parse_signatures()?;

        self.literal(b",\"signed\":")?;
        // Tee boundary: from here to the signed value's closing brace,
        // every consumed byte also feeds the armed slots.
        self.in_signed = true;

        self.literal(b"{\"_type\":")?;
        let n = self.text()?;
        if self.scratch.get().buf[..n] != *b"Targets" {
            return Err(TargetsError::WrongType);
        }

        self.literal(b",\"expires\":")?;
        let expires = self.time()?;
        if self.now > expires {
            return Err(TargetsError::Expired);
        }

        self.literal(b",\"targets\":{")?;
        let scan = self.parse_targets()?;

        self.literal(b",\"version\":")?;
        let version = self.uint()?;
        if version < self.version_prev {
            return Err(TargetsError::Downgrade {
                version,
                previous: self.version_prev,
            });
        }
        if scan.duplicate {
            return Err(TargetsError::DuplicateEcuTarget);
        }

        self.literal(b"}")?;
        self.in_signed = false;

        let valid = pipeline::finalize(&mut self.scratch.get().slots);
        if valid < self.threshold {
            return Err(TargetsError::SignatureThreshold {
                valid,
                threshold: self.threshold,
            });
        }

        self.literal(b"}")?;

        match scan.matched {
            None => Ok(Verdict::NoImage),
            Some(entry) => {
                let Some(sha512) = entry.sha512 else {
                    return Err(TargetsError::MissingSha512);
                };
                if version == self.version_prev {
                    Ok(Verdict::NoUpdate { version })
                } else {
                    Ok(Verdict::Update(TargetImage {
                        sha512,
                        length: entry.length,
                        version,
                    }))
                }
            }
        }
    }

    /// Parses the `signatures` array, arming one slot per entry whose keyid
    /// names a trusted key and whose method is supported. Everything else is
    /// grammar-checked and dropped.
    fn parse_signatures(&mut self) -> Result<(), TargetsError> {
        let keys = self.keys;

        for _ in 0..MAX_SIGS {
            self.literal(b"{\"keyid\":")?;
            let mut keyid = [0u8; KEYID_LEN];
            if self.hex(&mut keyid)? != KEYID_LEN {
                return Err(TargetsError::Json);
            }
            let mut slot = pipeline::lookup_key(keys, &keyid);

            self.literal(b",\"method\":")?;
            let n = self.text()?;
            if !method_supported(&self.scratch.get().buf[..n]) {
                slot = None;
            }
            // First entry for a key wins; a re-presented keyid is dropped.
            if let Some(i) = slot {
                if self.scratch.get().slots[i].is_armed() {
                    slot = None;
                }
            }

            self.literal(b",\"sig\":")?;
            match slot {
                None => self.skip_text()?,
                Some(i) => {
                    let mut sig = [0u8; SIG_LEN];
                    let len = self.hex(&mut sig)?;
                    if len == 0 {
                        return Err(TargetsError::Json);
                    }
                    self.scratch.get().slots[i].arm(&keys[i], &sig[..len]);
                }
            }

            match self.read_byte()? {
                b']' => return Ok(()),
                b',' => {}
                _ => return Err(TargetsError::Json),
            }
        }

        // The array did not close within the slot limit.
        Err(TargetsError::Json)
    }

    /// Parses the `targets` object and returns the entry addressed to this
    /// ECU, if any. Non-matching entries are fully grammar-checked but store
    /// nothing; a second matching entry marks the scan as duplicate.
    fn parse_targets(&mut self) -> Result<TargetsScan, TargetsError> {
        let ecu_id = self.ecu_id;
        let hardware_id = self.hardware_id;
        let mut matched: Option<MatchedEntry> = None;
        let mut duplicate = false;

        loop {
            self.skip_text()?; // target path; unbounded, not ours to keep

            self.literal(b":{\"custom\":{\"ecu_identifier\":")?;
            let n = self.text()?;
            let mut ignore = self.scratch.get().buf[..n] != *ecu_id;

            self.literal(b",\"hardware_identifier\":")?;
            let n = self.text()?;
            if self.scratch.get().buf[..n] != *hardware_id {
                ignore = true;
            }

            self.literal(b",\"release_counter\":")?;
            let _release_counter = self.uint()?;

            self.literal(b"},\"hashes\":{")?;
            let mut sha512: Option<[u8; SHA512_LEN]> = None;
            loop {
                let n = self.text()?;
                let is_sha512 = self.scratch.get().buf[..n] == *b"sha512";
                if !ignore && is_sha512 {
                    let mut digest = [0u8; SHA512_LEN];
                    if self.hex(&mut digest)? != SHA512_LEN {
                        return Err(TargetsError::Json);
                    }
                    sha512 = Some(digest);
                } else {
                    self.skip_text()?;
                }

                match self.read_byte()? {
                    b'}' => break,
                    b',' => {}
                    _ => return Err(TargetsError::Json),
                }
            }

            self.literal(b",\"length\":")?;
            let length = self.uint()?;

            if !ignore {
                if matched.is_some() {
                    duplicate = true;
                } else {
                    matched = Some(MatchedEntry { sha512, length });
                }
            }

            self.literal(b"}")?;
            match self.read_byte()? {
                b'}' => return Ok(TargetsScan { matched, duplicate }),
                b',' => {}
                _ => return Err(TargetsError::Json),
            }
        }
    }

    // ---- primitive readers -------------------------------------------------
    //
    // Every primitive consumes through `read_byte`/`read_exact_into`, the
    // tee choke point. Nothing below may touch `self.source` directly except
    // those two helpers and `uint`'s peek (peeked bytes are not forwarded
    // until consumed).

    fn feed(&mut self, bytes: &[u8]) {
        if self.in_signed {
            pipeline::feed(&mut self.scratch.get().slots, bytes);
        }
    }

    fn read_byte(&mut self) -> Result<u8, TargetsError> {
        let mut byte = [0u8; 1];
        if !self.source.read_exact(&mut byte) {
            return Err(TargetsError::Json);
        }
        self.feed(&byte);
        Ok(byte[0])
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), TargetsError> {
        if !self.source.read_exact(buf) {
            return Err(TargetsError::Json);
        }
        self.feed(buf);
        Ok(())
    }

    /// Matches a fixed byte run exactly.
    fn literal(&mut self, expected: &'static [u8]) -> Result<(), TargetsError> {
        debug_assert!(expected.len() <= MAX_LITERAL);
        let mut buf = [0u8; MAX_LITERAL];
        let buf = &mut buf[..expected.len()];
        self.read_exact_into(buf)?;
        if buf == expected {
            Ok(())
        } else {
            Err(TargetsError::Json)
        }
    }

    /// Reads a quoted string into the scratch buffer and returns its length.
    /// No escape processing; a string that does not close within the buffer
    /// is a failure.
    fn text(&mut self) -> Result<usize, TargetsError> {
        if self.read_byte()? != b'"' {
            return Err(TargetsError::Json);
        }
        for i in 0..BUF_SIZE {
            let byte = self.read_byte()?;
            if byte == b'"' {
                return Ok(i);
            }
            self.scratch.get().buf[i] = byte;
        }
        Err(TargetsError::Json)
    }

    /// Consumes a quoted string of any length, keeping nothing.
    fn skip_text(&mut self) -> Result<(), TargetsError> {
        if self.read_byte()? != b'"' {
            return Err(TargetsError::Json);
        }
        loop {
            if self.read_byte()? == b'"' {
                return Ok(());
            }
        }
    }

    /// Reads a quoted hex string into `out`, MSB-first nibble pairs, and
    /// returns the decoded byte count. Odd-length and non-hex input fail, as
    /// does anything longer than `out`.
    fn hex(&mut self, out: &mut [u8]) -> Result<usize, TargetsError> {
        if self.read_byte()? != b'"' {
            return Err(TargetsError::Json);
        }
        let mut n = 0;
        loop {
            let hi = self.read_byte()?;
            if hi == b'"' {
                return Ok(n);
            }
            if n == out.len() {
                return Err(TargetsError::Json);
            }
            let lo = self.read_byte()?;
            let (Some(hi), Some(lo)) = (hex_val(hi), hex_val(lo)) else {
                return Err(TargetsError::Json);
            };
            out[n] = (hi << 4) | lo;
            n += 1;
        }
    }

    /// Reads an unsigned decimal integer off the peek stream; at least one
    /// digit. Accumulates with wrapping arithmetic; callers bound the range
    /// where it matters.
    fn uint(&mut self) -> Result<u32, TargetsError> {
        let mut value: u32 = 0;
        let mut digits = 0usize;
        loop {
            let Some(byte) = self.source.peek() else {
                return Err(TargetsError::Json);
            };
            if !byte.is_ascii_digit() {
                break;
            }
            value = value.wrapping_mul(10).wrapping_add(u32::from(byte - b'0'));
            digits += 1;
            // Consume the digit we just accumulated (and tee it).
            self.read_byte()?;
        }
        if digits == 0 {
            return Err(TargetsError::Json);
        }
        Ok(value)
    }

    fn uint_bounded(&mut self, max: u32) -> Result<u32, TargetsError> {
        let value = self.uint()?;
        if value > max {
            return Err(TargetsError::Json);
        }
        Ok(value)
    }

    /// Matches `"YYYY-MM-DDTHH:MM:SSZ"` including both quotes; the `Z"` pair
    /// is one literal so the timestamp's closing quote is never left behind.
    fn time(&mut self) -> Result<UtcTime, TargetsError> {
        self.literal(b"\"")?;
        let year = self.uint_bounded(0xffff)?;
        self.literal(b"-")?;
        let month = self.uint_bounded(12)?;
        self.literal(b"-")?;
        let day = self.uint_bounded(31)?;
        self.literal(b"T")?;
        let hour = self.uint_bounded(23)?;
        self.literal(b":")?;
        let minute = self.uint_bounded(59)?;
        self.literal(b":")?;
        let second = self.uint_bounded(59)?;
        self.literal(b"Z\"")?;

        Ok(UtcTime {
            year: year as u16,
            month: month as u8,
            day: day as u8,
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
        })
    }
}

fn hex_val(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
