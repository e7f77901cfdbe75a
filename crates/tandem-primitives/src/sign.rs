use crate::crypto::{self, CryptoError, SigningKey};
use alloy_primitives::{keccak256, Bytes, B256};
use alloy_rlp::RlpEncodable;
use serde::{Deserialize, Serialize};

/// A committee member's vote signature over one fast block.
///
/// The signed message is the Keccak-256 of the RLP of everything except the
/// signature itself, so verifiers can recover the signer from
/// [`hash_without_sign`](Self::hash_without_sign) and `sign`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusSign {
    /// Fast height the vote applies to.
    pub fast_height: u64,
    /// Hash of the voted fast block.
    pub fast_hash: B256,
    /// Vote outcome (agree / against).
    pub result: u32,
    /// 65-byte recoverable signature over [`hash_without_sign`](Self::hash_without_sign).
    pub sign: Bytes,
}

#[derive(RlpEncodable)]
struct SignPayload {
    fast_height: u64,
    fast_hash: B256,
    result: u32,
}

impl ConsensusSign {
    /// Builds and signs a vote with the given key.
    pub fn signed(
        key: &SigningKey,
        fast_height: u64,
        fast_hash: B256,
        result: u32,
    ) -> Result<Self, CryptoError> {
        let mut sign = Self { fast_height, fast_hash, result, sign: Bytes::new() };
        sign.sign = crypto::sign_hash(key, &sign.hash_without_sign())?;
        Ok(sign)
    }

    /// Hash of the vote with the signature field excluded.
    pub fn hash_without_sign(&self) -> B256 {
        let payload = SignPayload {
            fast_height: self.fast_height,
            fast_hash: self.fast_hash,
            result: self.result,
        };
        keccak256(alloy_rlp::encode(&payload))
    }
}
