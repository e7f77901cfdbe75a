//! Epoch boundary arithmetic.
//!
//! A committee epoch spans `z` consecutive snail blocks. The switch-check
//! height sits `lamada` blocks before the epoch's last snail block; its
//! arrival on chain is what triggers the next election, giving the PoW
//! chain a confirmation margin before membership is derived from it.

use tandem_chainspec::ElectionParams;

/// Position of a snail height within the epoch schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochBoundary {
    /// Epoch the snail height falls in (0 = genesis epoch).
    pub epoch: u64,
    /// Last snail height of the epoch's election schedule: `epoch * z`.
    pub last_snail: u64,
    /// Switch-check height: `last_snail - lamada`.
    pub switch_check: u64,
}

impl EpochBoundary {
    pub fn of(snail_number: u64, params: &ElectionParams) -> Self {
        let epoch = snail_number / params.z;
        let last_snail = epoch * params.z;
        Self {
            epoch,
            last_snail,
            switch_check: last_snail.saturating_sub(params.lamada),
        }
    }
}
