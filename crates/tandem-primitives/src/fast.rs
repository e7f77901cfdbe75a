use alloy_primitives::{keccak256, B256};
use alloy_rlp::RlpEncodable;
use serde::{Deserialize, Serialize};

/// Header of a fast-chain block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, RlpEncodable)]
pub struct FastHeader {
    pub number: u64,
    pub parent_hash: B256,
    pub timestamp: u64,
}

impl FastHeader {
    /// Keccak-256 of the RLP-encoded header.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}

/// A block on the BFT fast chain. The election engine only needs headers;
/// transaction payloads live with the execution layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastBlock {
    header: FastHeader,
}

impl FastBlock {
    pub fn new(header: FastHeader) -> Self {
        Self { header }
    }

    pub fn header(&self) -> &FastHeader {
        &self.header
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> B256 {
        self.header.hash()
    }
}
