use crate::crypto::{self, CryptoError};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::RlpEncodable;
use serde::{Deserialize, Serialize};

/// Header of a proof-of-work snail block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, RlpEncodable)]
pub struct SnailHeader {
    pub number: u64,
    pub parent_hash: B256,
    pub coinbase: Address,
    pub pow_difficulty: U256,
    pub timestamp: u64,
}

impl SnailHeader {
    /// Keccak-256 of the RLP-encoded header.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}

/// A snail block: a PoW block carrying the fruits mined since its parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnailBlock {
    header: SnailHeader,
    fruits: Vec<Fruit>,
}

impl SnailBlock {
    pub fn new(header: SnailHeader, fruits: Vec<Fruit>) -> Self {
        Self { header, fruits }
    }

    pub fn header(&self) -> &SnailHeader {
        &self.header
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// Fruits in the order they were mined into the block.
    pub fn fruits(&self) -> &[Fruit] {
        &self.fruits
    }
}

/// Header of a fruit: the PoW artifact that certifies one fast block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruitHeader {
    /// Snail block height the fruit was included at.
    pub snail_number: u64,
    /// Fast block the fruit certifies.
    pub fast_number: u64,
    pub fast_hash: B256,
    /// Whether the miner signals willingness to join the committee.
    pub to_elect: bool,
    /// Raw SEC1 bytes of the miner's public key, as mined.
    pub pubkey: Bytes,
    pub coinbase: Address,
    pub fruit_difficulty: U256,
}

/// A fruit embedded in a snail block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fruit {
    header: FruitHeader,
}

impl Fruit {
    pub fn new(header: FruitHeader) -> Self {
        Self { header }
    }

    pub fn header(&self) -> &FruitHeader {
        &self.header
    }

    pub fn to_elect(&self) -> bool {
        self.header.to_elect
    }

    /// Validates the mined key bytes and returns the canonical uncompressed
    /// encoding. Fruits with undecodable keys are skipped by the election.
    pub fn pubkey(&self) -> Result<Bytes, CryptoError> {
        crypto::validate_pubkey(&self.header.pubkey)
    }

    pub fn coinbase(&self) -> Address {
        self.header.coinbase
    }

    pub fn snail_number(&self) -> u64 {
        self.header.snail_number
    }

    pub fn fast_number(&self) -> u64 {
        self.header.fast_number
    }

    pub fn fast_hash(&self) -> B256 {
        self.header.fast_hash
    }
}
