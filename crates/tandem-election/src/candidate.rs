//! Candidate extraction: scans an inclusive snail-block range, collects the
//! fruits whose miners opted into election, weights each candidate by the
//! excess work its fruit contributed, and slices the 256-bit lottery
//! interval proportionally.
//!
//! All interval arithmetic runs in 512-bit integers because the interval
//! bound is `2^256` itself, one past `U256::MAX`. Identical inputs must
//! produce identical intervals on every node.

use crate::chain::{DifficultyEngine, SnailchainReader};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256, U512};
use std::collections::HashMap;
use tandem_chainspec::ElectionParams;
use tracing::{debug, trace, warn};

/// Upper bound of the lottery interval: `2^256`.
pub(crate) fn lottery_bound() -> U512 {
    U512::from(1u64) << 256
}

/// Widens a 256-bit difficulty into the 512-bit interval domain.
pub(crate) fn widen(value: U256) -> U512 {
    U512::from_limbs_slice(value.as_limbs())
}

/// A miner eligible for the committee lottery, with its half-open slice
/// `[lower, upper)` of the lottery interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateMember {
    pub coinbase: Address,
    pub address: Address,
    pub public_key: Bytes,
    /// Excess work: actual minus target difficulty of the fruit.
    pub difficulty: U256,
    pub lower: U512,
    pub upper: U512,
}

/// Collects candidates and the election seed from the inclusive snail range
/// `[begin, end]`.
///
/// Returns `None` if any block in the range is missing, or if the range
/// yields no electable weight; the election is then unavailable and a later
/// chain event retries it.
pub fn candidates_from_range<S, E>(
    snailchain: &S,
    engine: &E,
    params: &ElectionParams,
    begin: u64,
    end: u64,
) -> Option<(B256, Vec<CandidateMember>)>
where
    S: SnailchainReader + ?Sized,
    E: DifficultyEngine + ?Sized,
{
    let mut fruit_counts: HashMap<Address, u32> = HashMap::new();
    let mut found = Vec::new();
    let mut seed_bytes = Vec::new();

    for number in begin..=end {
        let Some(block) = snailchain.block_by_number(number) else {
            warn!(number, "snail block missing, election unavailable");
            return None;
        };

        seed_bytes.extend_from_slice(block.hash().as_slice());

        for fruit in block.fruits() {
            if !fruit.to_elect() {
                continue;
            }
            // fruits with undecodable keys are skipped, not fatal
            let Ok(public_key) = fruit.pubkey() else {
                continue;
            };
            let address = tandem_primitives::pubkey_to_address(&public_key);

            let (actual, target) = engine.get_difficulty(fruit.header());

            found.push(CandidateMember {
                coinbase: fruit.coinbase(),
                address,
                public_key,
                difficulty: actual.saturating_sub(target),
                lower: U512::ZERO,
                upper: U512::ZERO,
            });
            *fruit_counts.entry(address).or_insert(0) += 1;
        }
    }

    debug!(
        fruits = found.len(),
        miners = fruit_counts.len(),
        "collected committee candidates"
    );

    let mut candidates: Vec<CandidateMember> = found
        .into_iter()
        .filter(|candidate| {
            let count = fruit_counts.get(&candidate.address).copied().unwrap_or(0);
            trace!(address = %candidate.address, count, difficulty = %candidate.difficulty, "candidate fruit count");
            count >= params.fruit_threshold
        })
        .collect();

    debug!(count = candidates.len(), "final candidate set");

    if !assign_intervals(&mut candidates) {
        warn!(first = begin, last = end, "candidate range has no electable weight");
        return None;
    }

    Some((keccak256(&seed_bytes), candidates))
}

/// Slices `[0, 2^256)` across the candidates proportionally to difficulty,
/// in discovery order. The last candidate's upper bound absorbs the integer
/// division remainder. Returns false when the total weight is zero.
pub fn assign_intervals(candidates: &mut [CandidateMember]) -> bool {
    let total = candidates
        .iter()
        .fold(U512::ZERO, |acc, candidate| acc + widen(candidate.difficulty));
    if total.is_zero() {
        return false;
    }

    let rate = lottery_bound() / total;
    let mut acc = U512::ZERO;
    let last = candidates.len() - 1;
    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.lower = rate * acc;
        acc += widen(candidate.difficulty);
        candidate.upper = if i == last { lottery_bound() } else { rate * acc };
    }
    true
}
