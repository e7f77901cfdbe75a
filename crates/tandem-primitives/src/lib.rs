//! Core data types for the tandem hybrid chain.
//!
//! The tandem node runs two interleaved chains: a high-throughput fast chain
//! finalized by a BFT committee, and a proof-of-work snail chain whose blocks
//! embed [`Fruit`]s: PoW artifacts that each certify one fast block and may
//! signal the miner's willingness to join the committee. This crate holds the
//! types both chains and the election engine share, plus the secp256k1/Keccak
//! helpers used for committee membership and vote verification.

pub mod committee;
pub mod crypto;
pub mod fast;
pub mod sign;
pub mod snail;

pub use committee::{CommitteeMember, ElectionEvent, ElectionOption};
pub use crypto::{
    pubkey_to_address, recover_pubkey, sign_hash, validate_pubkey, CryptoError, PUBKEY_LENGTH,
    SIGNATURE_LENGTH,
};
pub use fast::{FastBlock, FastHeader};
pub use sign::ConsensusSign;
pub use snail::{Fruit, FruitHeader, SnailBlock, SnailHeader};
