//! Election protocol parameters for the tandem chain.
//!
//! The defaults are the protocol values; every node must agree on them
//! bit-for-bit since committee membership is derived deterministically from
//! snail-chain history. Tests shrink `z` to keep fixtures small.

use serde::{Deserialize, Serialize};
use tandem_primitives::CommitteeMember;

/// Snail blocks per committee epoch.
pub const Z: u64 = 1440;

/// Fast-block lag granted past a committee's election window.
pub const K: u64 = 1000;

/// Snail confirmation depth backed off the epoch boundary.
pub const LAMADA: u64 = 12;

/// Minimum fruits an address must contribute to stay a candidate.
pub const FRUIT_THRESHOLD: u32 = 1;

/// Committee size bounds for the lottery.
pub const MAX_COMMITTEE: usize = 40;
pub const MIN_COMMITTEE: usize = 1;

/// Tunable parameters of the committee election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionParams {
    /// Snail blocks per epoch.
    pub z: u64,
    /// Fast-block lag.
    pub k: u64,
    /// Snail confirmation depth.
    pub lamada: u64,
    /// Per-address fruit count threshold for candidacy.
    pub fruit_threshold: u32,
    /// Upper committee size bound (lottery round floor).
    pub max_committee: usize,
    /// Lower committee size bound.
    pub min_committee: usize,
}

impl Default for ElectionParams {
    fn default() -> Self {
        Self {
            z: Z,
            k: K,
            lamada: LAMADA,
            fruit_threshold: FRUIT_THRESHOLD,
            max_committee: MAX_COMMITTEE,
            min_committee: MIN_COMMITTEE,
        }
    }
}

impl ElectionParams {
    /// Validates that the parameters are internally consistent.
    ///
    /// Checks:
    /// - `z > lamada` (the switch-check window must fit inside an epoch)
    /// - `k > 0`
    /// - `1 <= min_committee <= max_committee`
    /// - `fruit_threshold >= 1`
    pub fn validate(&self) -> Result<(), String> {
        if self.z <= self.lamada {
            return Err(format!(
                "z ({}) must be greater than lamada ({})",
                self.z, self.lamada
            ));
        }
        if self.k == 0 {
            return Err("k must be > 0".to_string());
        }
        if self.min_committee == 0 {
            return Err("min_committee must be >= 1".to_string());
        }
        if self.min_committee > self.max_committee {
            return Err(format!(
                "min_committee ({}) must be <= max_committee ({})",
                self.min_committee, self.max_committee
            ));
        }
        if self.fruit_threshold == 0 {
            return Err("fruit_threshold must be >= 1".to_string());
        }
        Ok(())
    }
}

/// The bootstrap committee fixed by snail-chain genesis. It authorizes fast
/// blocks from height 1 until the first elected committee takes over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisCommittee {
    pub members: Vec<CommitteeMember>,
}

impl GenesisCommittee {
    pub fn new(members: Vec<CommitteeMember>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
