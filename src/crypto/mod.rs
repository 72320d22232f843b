//! Cryptographic primitives for the vault.
//!
//! Provides key derivation, authenticated encryption, randomness sourcing
//! and constant-time comparison.

pub mod aead;
pub mod compare;
pub mod kdf;
pub mod random;

pub use aead::{open, seal};
pub use compare::constant_time_eq;
pub use kdf::{CostLimits, ParameterSet, derive_key};
pub use random::{OsRandom, RandomSource};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the nonce (12 bytes for AES-256-GCM).
pub const NONCE_LEN: usize = 12;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;
