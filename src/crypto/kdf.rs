use argon2::{Algorithm, Argon2, Params, Version};
use tracing::debug;
use zeroize::Zeroizing;

use super::KEY_LEN;
use crate::error::{Result, VaultError};

/// Argon2id cost parameters.
///
/// Immutable once built; every constructor validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSet {
    time: u32,
    memory_kib: u32,
    parallelism: u8,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            time: 3,
            memory_kib: 64 * 1024, // 64 MiB
            parallelism: 4,
        }
    }
}

impl ParameterSet {
    pub fn new(time: u32, memory_kib: u32, parallelism: u8) -> Result<Self> {
        let params = Self {
            time,
            memory_kib,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn parallelism(&self) -> u8 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        if self.time < 1 {
            return Err(VaultError::Parameter("argon2 time cost must be >= 1".into()));
        }
        if self.parallelism < 1 {
            return Err(VaultError::Parameter(
                "argon2 parallelism must be >= 1".into(),
            ));
        }
        if self.memory_kib < 8 * u32::from(self.parallelism) {
            return Err(VaultError::Parameter(
                "argon2 memory cost must be at least 8 * parallelism KiB".into(),
            ));
        }
        Ok(())
    }

    /// Checks the set against upper bounds.
    pub fn check_within(&self, limits: &CostLimits) -> Result<()> {
        if self.time > limits.max_time {
            return Err(VaultError::Parameter(format!(
                "argon2 time cost {} exceeds limit {}",
                self.time, limits.max_time
            )));
        }
        if self.memory_kib > limits.max_memory_kib {
            return Err(VaultError::Parameter(format!(
                "argon2 memory cost {} KiB exceeds limit {} KiB",
                self.memory_kib, limits.max_memory_kib
            )));
        }
        if self.parallelism > limits.max_parallelism {
            return Err(VaultError::Parameter(format!(
                "argon2 parallelism {} exceeds limit {}",
                self.parallelism, limits.max_parallelism
            )));
        }
        Ok(())
    }
}

/// Upper bounds on the cost parameters a token may demand.
///
/// Envelopes carry their own parameters, so without a ceiling a hostile
/// token could make decryption allocate gigabytes or spin for minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostLimits {
    pub max_time: u32,
    pub max_memory_kib: u32,
    pub max_parallelism: u8,
}

impl Default for CostLimits {
    fn default() -> Self {
        Self {
            max_time: 16,
            max_memory_kib: 1024 * 1024, // 1 GiB
            max_parallelism: 64,
        }
    }
}

impl CostLimits {
    /// Raises each bound as far as needed to admit `params`.
    pub fn covering(self, params: &ParameterSet) -> Self {
        Self {
            max_time: self.max_time.max(params.time),
            max_memory_kib: self.max_memory_kib.max(params.memory_kib),
            max_parallelism: self.max_parallelism.max(params.parallelism),
        }
    }
}

/// Derives a 32-byte key with Argon2id.
///
/// The returned buffer is wiped when dropped, on every exit path.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    params: ParameterSet,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    params.validate()?;

    let argon_params = Params::new(
        params.memory_kib,
        params.time,
        u32::from(params.parallelism),
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::Parameter(format!("failed to construct Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    debug!(
        time = params.time,
        memory_kib = params.memory_kib,
        parallelism = params.parallelism,
        "deriving key"
    );

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| VaultError::Parameter(format!("argon2 key derivation failed: {e}")))?;

    Ok(key)
}
