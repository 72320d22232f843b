//! Envelope format for vault tokens.
//!
//! Provides version-aware parsing and serialization of the binary envelope,
//! and the base64 text layer that turns it into a token.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    crypto::{NONCE_LEN, ParameterSet, SALT_LEN},
    error::{Result, VaultError},
};

pub mod v1;

pub use v1::EnvelopeV1;

/// Length of version field.
pub const VER_LEN: usize = 1;
/// Latest format version.
pub const CURRENT_VERSION: u8 = v1::VERSION_V1;
/// Smallest byte length any envelope may have.
pub const MIN_ENVELOPE_LEN: usize = v1::HEADER_LEN;

/// A parsed envelope, tagged by format version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    V1(EnvelopeV1),
}

impl Envelope {
    /// Returns the format version.
    pub fn version(&self) -> u8 {
        match self {
            Envelope::V1(_) => v1::VERSION_V1,
        }
    }

    /// Returns the salt used for key derivation.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        match self {
            Envelope::V1(e) => e.salt(),
        }
    }

    /// Returns the nonce used for encryption.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        match self {
            Envelope::V1(e) => e.nonce(),
        }
    }

    /// Returns the cost parameters the key was derived with.
    pub fn params(&self) -> ParameterSet {
        match self {
            Envelope::V1(e) => e.params(),
        }
    }

    /// Returns `ciphertext || tag`.
    pub fn sealed(&self) -> &[u8] {
        match self {
            Envelope::V1(e) => e.sealed(),
        }
    }

    /// Non-secret header metadata.
    pub fn info(&self) -> EnvelopeInfo {
        let params = self.params();
        EnvelopeInfo {
            version: self.version(),
            time: params.time(),
            memory_kib: params.memory_kib(),
            parallelism: params.parallelism(),
            salt: STANDARD.encode(self.salt()),
            nonce: STANDARD.encode(self.nonce()),
            sealed_len: self.sealed().len(),
        }
    }
}

/// Header fields of an envelope, safe to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeInfo {
    pub version: u8,
    pub time: u32,
    pub memory_kib: u32,
    pub parallelism: u8,
    pub salt: String,
    pub nonce: String,
    pub sealed_len: usize,
}

/// Parses an envelope from raw bytes.
///
/// The length and the version byte are both checked before any field is
/// sliced, and dispatch goes to the matching version parser.
///
/// # Errors
///
/// Returns [`VaultError::Format`] if:
/// - The buffer is shorter than [`MIN_ENVELOPE_LEN`]
/// - The version is unsupported
pub fn decode(data: &[u8]) -> Result<Envelope> {
    if data.len() < MIN_ENVELOPE_LEN {
        return Err(VaultError::Format(format!(
            "envelope too short: {} bytes, need at least {MIN_ENVELOPE_LEN}",
            data.len()
        )));
    }

    match data[0] {
        v1::VERSION_V1 => v1::parse(data).map(Envelope::V1),
        other => {
            warn!(version = other, "rejecting envelope with unsupported version");
            Err(VaultError::Format(format!(
                "unsupported envelope version: {other}"
            )))
        }
    }
}

/// Serializes an envelope to bytes.
pub fn encode(envelope: &Envelope) -> Vec<u8> {
    match envelope {
        Envelope::V1(e) => v1::serialize(e),
    }
}

/// Encodes an envelope as a standard-base64 token.
pub fn to_token(envelope: &Envelope) -> String {
    let token = STANDARD.encode(encode(envelope));
    debug!(len = token.len(), "encoded token");
    token
}

/// Decodes a token produced by [`to_token`].
///
/// Surrounding ASCII whitespace is ignored.
///
/// # Errors
///
/// Returns [`VaultError::Encoding`] if the text is not base64, otherwise any
/// error of [`decode`].
pub fn from_token(token: &str) -> Result<Envelope> {
    let raw = STANDARD
        .decode(token.trim_ascii())
        .map_err(VaultError::Encoding)?;
    debug!(len = raw.len(), "decoded token");
    decode(&raw)
}
