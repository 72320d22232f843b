//! Envelope format v1.
//!
//! ```text
//! VERSION (1) | SALT (16) | NONCE (12) | TIME (4, BE) | MEMORY (4, BE) | PARALLELISM (1) | CIPHERTEXT || TAG
//! ```

use crate::{
    crypto::{NONCE_LEN, ParameterSet, SALT_LEN},
    error::{Result, VaultError},
    format::VER_LEN,
};

/// Format version handled by this module.
pub const VERSION_V1: u8 = 1;

const TIME_LEN: usize = 4;
const MEM_LEN: usize = 4;
const PAR_LEN: usize = 1;

/// Fixed header size; 38 bytes.
pub const HEADER_LEN: usize = VER_LEN + SALT_LEN + NONCE_LEN + TIME_LEN + MEM_LEN + PAR_LEN;

/// Fields of a v1 envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeV1 {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    params: ParameterSet,
    sealed: Vec<u8>,
}

impl EnvelopeV1 {
    pub fn new(
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        params: ParameterSet,
        sealed: Vec<u8>,
    ) -> Self {
        Self {
            salt,
            nonce,
            params,
            sealed,
        }
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn params(&self) -> ParameterSet {
        self.params
    }

    pub fn sealed(&self) -> &[u8] {
        &self.sealed
    }
}

/// Parses a v1 envelope. The caller has already checked the version byte.
///
/// # Errors
///
/// Returns [`VaultError::Format`] if the data is too short, or
/// [`VaultError::Parameter`] if the embedded cost parameters are invalid.
pub fn parse(data: &[u8]) -> Result<EnvelopeV1> {
    if data.len() < HEADER_LEN {
        return Err(VaultError::Format("envelope too short for v1".into()));
    }

    let mut offset = VER_LEN;

    let salt: [u8; SALT_LEN] = read_array(data, &mut offset);
    let nonce: [u8; NONCE_LEN] = read_array(data, &mut offset);
    let time = u32::from_be_bytes(read_array(data, &mut offset));
    let memory_kib = u32::from_be_bytes(read_array(data, &mut offset));
    let [parallelism] = read_array::<PAR_LEN>(data, &mut offset);

    let sealed = data[offset..].to_vec();
    let params = ParameterSet::new(time, memory_kib, parallelism)?;

    Ok(EnvelopeV1::new(salt, nonce, params, sealed))
}

/// Serializes a v1 envelope.
pub fn serialize(envelope: &EnvelopeV1) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + envelope.sealed.len());

    buf.push(VERSION_V1);
    buf.extend_from_slice(&envelope.salt);
    buf.extend_from_slice(&envelope.nonce);
    buf.extend_from_slice(&envelope.params.time().to_be_bytes());
    buf.extend_from_slice(&envelope.params.memory_kib().to_be_bytes());
    buf.push(envelope.params.parallelism());
    buf.extend_from_slice(&envelope.sealed);

    buf
}

// Bounds are guaranteed by the HEADER_LEN check in `parse`.
fn read_array<const N: usize>(data: &[u8], offset: &mut usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[*offset..*offset + N]);
    *offset += N;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_len_is_38() {
        assert_eq!(HEADER_LEN, 38);
    }

    #[test]
    fn layout_is_byte_exact() {
        let env = EnvelopeV1::new(
            [0xAA; SALT_LEN],
            [0xBB; NONCE_LEN],
            ParameterSet::new(3, 65536, 4).unwrap(),
            vec![0xCC, 0xDD],
        );

        let bytes = serialize(&env);

        let mut expected = vec![0x01];
        expected.extend_from_slice(&[0xAA; 16]);
        expected.extend_from_slice(&[0xBB; 12]);
        expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x03]);
        expected.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]);
        expected.push(0x04);
        expected.extend_from_slice(&[0xCC, 0xDD]);

        assert_eq!(bytes, expected);
    }

    #[test]
    fn parse_reads_every_field() {
        let env = EnvelopeV1::new(
            [1u8; SALT_LEN],
            [2u8; NONCE_LEN],
            ParameterSet::new(2, 1024, 2).unwrap(),
            vec![0u8; 10],
        );

        let parsed = parse(&serialize(&env)).unwrap();

        assert_eq!(parsed.salt(), &[1u8; SALT_LEN]);
        assert_eq!(parsed.nonce(), &[2u8; NONCE_LEN]);
        assert_eq!(parsed.params().time(), 2);
        assert_eq!(parsed.params().memory_kib(), 1024);
        assert_eq!(parsed.params().parallelism(), 2);
        assert_eq!(parsed.sealed(), &[0u8; 10]);
    }

    #[test]
    fn header_only_has_empty_sealed() {
        let mut data = vec![0u8; HEADER_LEN];
        data[0] = VERSION_V1;
        data[29..33].copy_from_slice(&1u32.to_be_bytes());
        data[33..37].copy_from_slice(&64u32.to_be_bytes());
        data[37] = 1;

        let parsed = parse(&data).unwrap();
        assert!(parsed.sealed().is_empty());
    }

    #[test]
    fn zero_params_in_header_fail() {
        let mut data = vec![0u8; HEADER_LEN + 16];
        data[0] = VERSION_V1;

        assert!(matches!(parse(&data), Err(VaultError::Parameter(_))));
    }

    #[test]
    fn too_short_fails() {
        let data = vec![VERSION_V1; 10];
        assert!(matches!(parse(&data), Err(VaultError::Format(_))));
    }
}
