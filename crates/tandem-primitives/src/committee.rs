use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// One authorized signer of the BFT committee.
///
/// `public_key` is the canonical 65-byte SEC1 uncompressed encoding;
/// membership checks compare these bytes directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMember {
    /// Reward-recipient address associated with the signer.
    pub coinbase: Address,
    /// Uncompressed secp256k1 public key used to sign fast blocks.
    pub public_key: Bytes,
}

/// Committee lifecycle transition carried by an [`ElectionEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionOption {
    /// The next committee has been elected; the BFT layer should prepare it.
    Switchover,
    /// The committee begins proposing at `begin_fast_number`.
    Start,
    /// The committee has sealed its last fast block.
    Stop,
}

/// Event delivered to election subscribers (the BFT consensus layer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElectionEvent {
    pub option: ElectionOption,
    pub committee_id: u64,
    pub members: Vec<CommitteeMember>,
    /// First fast height the committee is authorized for; only on `Start`.
    pub begin_fast_number: Option<u64>,
}
