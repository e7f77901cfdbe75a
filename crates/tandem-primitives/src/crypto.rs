//! secp256k1 helpers for committee membership and vote verification.
//!
//! Public keys travel through the system in their canonical 65-byte SEC1
//! uncompressed encoding; membership checks compare those bytes directly.
//! Addresses are the last 20 bytes of the Keccak-256 of the encoded point
//! without its `0x04` tag.

use alloy_primitives::{keccak256, Address, Bytes, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

pub use k256::ecdsa::SigningKey;

/// Length of a SEC1 uncompressed public key.
pub const PUBKEY_LENGTH: usize = 65;

/// Length of a recoverable signature: `r || s || v`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Errors from the secp256k1 helpers.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The signature bytes are not a well-formed `r || s || v` triple.
    #[error("invalid signature encoding")]
    InvalidSignature,

    /// The bytes do not decode to a point on the secp256k1 curve.
    #[error("invalid secp256k1 public key")]
    InvalidPublicKey,

    /// Signature and hash do not yield a recoverable public key.
    #[error("public key recovery failed")]
    RecoveryFailed,

    /// Producing a recoverable signature failed.
    #[error("signing failed")]
    SigningFailed,
}

/// Recovers the signer's public key from a 32-byte message hash and a
/// 65-byte recoverable signature. The recovery byte accepts both the raw
/// 0/1 form and the legacy 27/28 form.
pub fn recover_pubkey(hash: &B256, sig: &[u8]) -> Result<Bytes, CryptoError> {
    if sig.len() != SIGNATURE_LENGTH {
        return Err(CryptoError::InvalidSignature);
    }
    let v = sig[SIGNATURE_LENGTH - 1];
    let v = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(v).ok_or(CryptoError::InvalidSignature)?;
    let signature =
        Signature::from_slice(&sig[..64]).map_err(|_| CryptoError::InvalidSignature)?;
    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(encode_pubkey(&key))
}

/// Canonical 65-byte uncompressed encoding of a verifying key.
pub fn encode_pubkey(key: &VerifyingKey) -> Bytes {
    key.to_encoded_point(false).as_bytes().to_vec().into()
}

/// Parses raw SEC1 bytes (compressed or uncompressed) and returns the
/// canonical uncompressed encoding.
pub fn validate_pubkey(raw: &[u8]) -> Result<Bytes, CryptoError> {
    let key = VerifyingKey::from_sec1_bytes(raw).map_err(|_| CryptoError::InvalidPublicKey)?;
    Ok(encode_pubkey(&key))
}

/// Derives the 20-byte address for an uncompressed public key.
pub fn pubkey_to_address(pubkey: &[u8]) -> Address {
    debug_assert_eq!(pubkey.len(), PUBKEY_LENGTH, "expected uncompressed sec1 key");
    let digest = keccak256(&pubkey[1..]);
    Address::from_slice(&digest[12..])
}

/// Signs a 32-byte prehash, returning the 65-byte `r || s || v` form with a
/// raw (0/1) recovery byte. Counterpart of [`recover_pubkey`].
pub fn sign_hash(key: &SigningKey, hash: &B256) -> Result<Bytes, CryptoError> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(hash.as_slice())
        .map_err(|_| CryptoError::SigningFailed)?;
    let mut out = Vec::with_capacity(SIGNATURE_LENGTH);
    out.extend_from_slice(&signature.to_bytes());
    out.push(recovery_id.to_byte());
    Ok(out.into())
}
