use getrandom::fill;

use crate::error::{Result, VaultError};

/// A cryptographically secure source of random bytes.
pub trait RandomSource: Send + Sync {
    /// Fills `buf` completely or fails with [`VaultError::Randomness`].
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        fill(buf).map_err(|_| VaultError::Randomness)
    }
}

/// Draws a fixed-size array from `rng`.
pub fn random_array<const N: usize, R: RandomSource + ?Sized>(rng: &R) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    rng.fill(&mut out)?;
    Ok(out)
}
