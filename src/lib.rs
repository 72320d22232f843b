//! Password-based authenticated encryption into self-describing tokens.
//!
//! A [`Vault`] turns a password and some plaintext into a base64 token that
//! carries everything needed to reverse the operation (salt, nonce, Argon2id
//! cost parameters, format version) except the password itself.

pub mod crypto;
mod error;
pub mod format;
pub mod storage;

use std::fmt;

use tracing::warn;
use zeroize::Zeroizing;

pub use crate::crypto::{CostLimits, OsRandom, ParameterSet, RandomSource, constant_time_eq};
use crate::crypto::{NONCE_LEN, SALT_LEN, aead, derive_key, random::random_array};
pub use crate::error::{Result, VaultError};
use crate::format::{Envelope, EnvelopeV1};
pub use crate::storage::{TokenStore, resolve_path};

/// Encrypts and decrypts tokens under one password.
///
/// Immutable after construction and holds no per-call state, so one value can
/// be shared freely between threads.
pub struct Vault<R: RandomSource = OsRandom> {
    password: Zeroizing<String>,
    params: ParameterSet,
    limits: CostLimits,
    rng: R,
}

impl<R: RandomSource> fmt::Debug for Vault<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("password", &"<redacted>")
            .field("params", &self.params)
            .field("limits", &self.limits)
            .finish()
    }
}

impl Vault<OsRandom> {
    /// Creates a vault with the default cost profile.
    pub fn new(password: Zeroizing<String>) -> Result<Self> {
        Self::with_params(password, ParameterSet::default())
    }

    /// Creates a vault whose new tokens use `params`.
    pub fn with_params(password: Zeroizing<String>, params: ParameterSet) -> Result<Self> {
        Self::with_random(password, params, OsRandom)
    }

    /// Creates a vault with explicit bounds on the cost parameters it accepts
    /// from tokens. `params` must fit within `limits`.
    pub fn with_params_and_limits(
        password: Zeroizing<String>,
        params: ParameterSet,
        limits: CostLimits,
    ) -> Result<Self> {
        Self::with_random(password, params, OsRandom)?.with_limits(limits)
    }
}

impl<R: RandomSource> Vault<R> {
    /// Creates a vault drawing salts and nonces from `rng`.
    ///
    /// The default [`CostLimits`] are raised where needed so the vault can
    /// always open its own tokens.
    pub fn with_random(password: Zeroizing<String>, params: ParameterSet, rng: R) -> Result<Self> {
        if password.is_empty() {
            return Err(VaultError::Parameter("password must not be empty".into()));
        }
        params.validate()?;

        Ok(Self {
            password,
            params,
            limits: CostLimits::default().covering(&params),
            rng,
        })
    }

    /// Replaces the upper bounds applied to envelope cost parameters.
    ///
    /// The vault's own parameters must fit within the new limits.
    pub fn with_limits(mut self, limits: CostLimits) -> Result<Self> {
        self.params.check_within(&limits)?;
        self.limits = limits;
        Ok(self)
    }

    pub fn params(&self) -> ParameterSet {
        self.params
    }

    pub fn limits(&self) -> CostLimits {
        self.limits
    }

    /// Encrypts `plaintext`, binding `aad` into the tag, and returns a token.
    ///
    /// Every call draws a fresh salt and nonce.
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<String> {
        let salt: [u8; SALT_LEN] = random_array(&self.rng)?;
        let nonce: [u8; NONCE_LEN] = random_array(&self.rng)?;

        self.encrypt_with(salt, nonce, plaintext, aad)
    }

    fn encrypt_with(
        &self,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<String> {
        let key = derive_key(self.password.as_bytes(), &salt, self.params)?;
        let sealed = aead::seal(&key, &nonce, plaintext, aad)?;
        drop(key);

        let envelope = Envelope::V1(EnvelopeV1::new(salt, nonce, self.params, sealed));
        Ok(format::to_token(&envelope))
    }

    /// Decrypts a token produced by [`Vault::encrypt`].
    ///
    /// The key is re-derived from the salt and cost parameters stored in the
    /// token, not from this vault's own parameters. Parameters above the
    /// vault's [`CostLimits`] are refused before any derivation runs.
    ///
    /// A wrong password, wrong `aad` or any corruption past the version byte
    /// (cost fields included) all yield [`VaultError::Authentication`].
    pub fn decrypt(&self, token: &str, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let envelope = match format::from_token(token) {
            Ok(envelope) => envelope,
            Err(VaultError::Parameter(_)) => {
                warn!("rejecting envelope with invalid cost parameters");
                return Err(VaultError::Authentication);
            }
            Err(e) => return Err(e),
        };
        let params = envelope.params();

        if params.check_within(&self.limits).is_err() {
            warn!(
                time = params.time(),
                memory_kib = params.memory_kib(),
                parallelism = params.parallelism(),
                "rejecting envelope with excessive cost parameters"
            );
            return Err(VaultError::Authentication);
        }

        let key = derive_key(self.password.as_bytes(), envelope.salt(), params)
            .map_err(|_| VaultError::Authentication)?;
        let plaintext = aead::open(&key, envelope.nonce(), envelope.sealed(), aad)?;

        Ok(Zeroizing::new(plaintext))
    }
}
