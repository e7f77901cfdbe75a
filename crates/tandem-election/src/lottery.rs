//! The committee lottery: a deterministic hash-chain draw over the weighted
//! candidate intervals.
//!
//! Every node must reproduce historical committees bit-for-bit, so the draw
//! arithmetic is frozen as deployed, including the reduction
//! `prop = draw / 2^256`, which truncates to zero for every possible draw
//! and therefore lands each round in the first candidate slice containing
//! zero. Changing the reduction would change every elected committee on the
//! chain.

use crate::candidate::{lottery_bound, CandidateMember};
use alloy_primitives::{keccak256, Address, B256, U512};
use std::collections::HashSet;
use tandem_chainspec::ElectionParams;
use tandem_primitives::CommitteeMember;
use tracing::{debug, warn};

/// Draws committee members from the candidate intervals.
///
/// Rounds iterate from zero; each round hashes the minimal big-endian bytes
/// of `seed + round` and maps the digest into the candidate slices. A
/// candidate whose address was already drawn yields no member for its round.
/// The loop exits once `max_committee` rounds have run and at least
/// `min_committee` members were drawn.
pub fn elect(
    candidates: &[CandidateMember],
    seed: B256,
    params: &ElectionParams,
) -> Vec<CommitteeMember> {
    let mut chosen: HashSet<Address> = HashSet::new();
    let mut members = Vec::new();

    if candidates.is_empty() {
        return members;
    }

    debug!(candidates = candidates.len(), "drawing committee members");

    let seed_int = U512::from_be_slice(seed.as_slice());
    let bound = lottery_bound();
    let mut round: u64 = 0;
    let mut stalled_rounds: u64 = 0;

    loop {
        let draw_seed = seed_int + U512::from(round);
        let digest = keccak256(draw_seed.to_be_bytes_trimmed_vec());
        let prop = U512::from_be_slice(digest.as_slice()) / bound;

        let mut progressed = false;
        for candidate in candidates {
            if prop < candidate.lower {
                continue;
            }
            if prop >= candidate.upper {
                continue;
            }
            if chosen.insert(candidate.address) {
                members.push(CommitteeMember {
                    coinbase: candidate.coinbase,
                    public_key: candidate.public_key.clone(),
                });
                progressed = true;
            }
            break;
        }
        if progressed {
            stalled_rounds = 0;
        } else {
            stalled_rounds += 1;
        }

        round += 1;
        if round >= params.max_committee as u64 {
            if members.len() >= params.min_committee {
                break;
            }
            // prop truncates identically every round, so a full extra sweep
            // without progress cannot recover
            if stalled_rounds > params.max_committee as u64 {
                warn!(
                    drawn = members.len(),
                    min = params.min_committee,
                    "lottery stalled below the minimum committee size"
                );
                break;
            }
        }
    }

    debug!(count = members.len(), "committee members drawn");

    members
}
