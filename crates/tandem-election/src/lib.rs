//! Committee election engine for the tandem hybrid chain.
//!
//! The engine derives, for every fast-chain height, the BFT committee
//! authorized to propose and sign that block. Membership comes from a
//! weighted lottery over the fruits mined into a window of snail blocks:
//! each opted-in miner's excess work buys it a slice of a 256-bit interval,
//! and a deterministic hash chain draws members from those slices. A rolling
//! state machine tracks the current and next committee across epochs of `z`
//! snail blocks and coordinates the switchover with the fast chain, so that
//! every node swaps committees at exactly the same fast height.
//!
//! The engine consumes the two chains and the PoW difficulty oracle through
//! the narrow traits in [`chain`]; it stores nothing persistently, since the
//! committee cache is rebuilt from chain state on demand.

pub mod candidate;
pub mod chain;
pub mod committee;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod lottery;
pub mod verify;

pub use candidate::{assign_intervals, candidates_from_range, CandidateMember};
pub use chain::{
    DifficultyEngine, FastChainHeadEvent, FastchainReader, SnailChainHeadEvent, SnailchainReader,
};
pub use committee::{Committee, CommitteeCache};
pub use engine::Election;
pub use epoch::EpochBoundary;
pub use error::ElectionError;
pub use lottery::elect;
pub use verify::{is_committee_member, member_by_pubkey};
