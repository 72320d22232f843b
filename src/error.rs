use thiserror::Error;

/// Errors produced by the vault and its storage layer.
///
/// No variant ever carries the password, a derived key or plaintext.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VaultError {
    /// Key-derivation cost parameters (or the password) are unusable.
    #[error("invalid parameters: {0}")]
    Parameter(String),

    /// The secure random source could not supply bytes.
    #[error("OS random generator unavailable")]
    Randomness,

    /// The envelope is truncated or carries an unsupported version.
    #[error("malformed envelope: {0}")]
    Format(String),

    /// The token is not valid base64.
    #[error("token is not valid base64")]
    Encoding(#[source] base64::DecodeError),

    /// Tag verification failed: wrong password, wrong associated data, or
    /// corrupted ciphertext. Deliberately indistinguishable.
    #[error("decryption failed: invalid password or corrupted data")]
    Authentication,

    /// Filesystem failure in the storage layer.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Only a randomness failure may succeed when retried with the same inputs.
    pub fn is_retriable(&self) -> bool {
        matches!(self, VaultError::Randomness)
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
