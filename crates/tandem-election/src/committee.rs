use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tandem_primitives::CommitteeMember;

/// One committee epoch: the member set authorized for a contiguous range of
/// fast heights, and the snail range it was elected from.
///
/// Records are shared between the committee cache and the switchover state
/// machine. They are immutable except for `end_fast_number`, which is sealed
/// exactly once when the epoch boundary is reached, transitioning the
/// record from open-ended (`0`) to closed.
#[derive(Debug)]
pub struct Committee {
    id: u64,
    begin_fast_number: u64,
    end_fast_number: AtomicU64,
    first_election_number: u64,
    last_election_number: u64,
    switch_check_number: u64,
    members: Vec<CommitteeMember>,
}

impl Committee {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        begin_fast_number: u64,
        end_fast_number: u64,
        first_election_number: u64,
        last_election_number: u64,
        switch_check_number: u64,
        members: Vec<CommitteeMember>,
    ) -> Self {
        Self {
            id,
            begin_fast_number,
            end_fast_number: AtomicU64::new(end_fast_number),
            first_election_number,
            last_election_number,
            switch_check_number,
            members,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// First fast height this committee is authorized for (inclusive).
    pub fn begin_fast_number(&self) -> u64 {
        self.begin_fast_number
    }

    /// Last authorized fast height; `0` means open-ended (still active).
    pub fn end_fast_number(&self) -> u64 {
        self.end_fast_number.load(Ordering::Acquire)
    }

    /// Seals the last authorized fast height. Happens exactly once, when the
    /// snail chain reaches the switch-check height.
    pub fn seal_end_fast(&self, end_fast_number: u64) {
        let prev = self.end_fast_number.swap(end_fast_number, Ordering::AcqRel);
        debug_assert_eq!(prev, 0, "committee {} end fast sealed twice", self.id);
    }

    /// First snail height of the election range (inclusive).
    pub fn first_election_number(&self) -> u64 {
        self.first_election_number
    }

    /// Last snail height of the election range (inclusive).
    pub fn last_election_number(&self) -> u64 {
        self.last_election_number
    }

    /// Snail height whose arrival triggers the next election.
    pub fn switch_check_number(&self) -> u64 {
        self.switch_check_number
    }

    /// Copy of the ordered member list.
    pub fn members(&self) -> Vec<CommitteeMember> {
        self.members.clone()
    }

    /// Whether the committee's fast range covers the given height.
    fn covers(&self, fast_number: u64) -> bool {
        if self.begin_fast_number > fast_number {
            return false;
        }
        let end = self.end_fast_number();
        end == 0 || end >= fast_number
    }
}

/// Concurrent map of committee id to record. Entries are inserted once and
/// never overwritten or removed; the cache is rebuildable from chain state.
#[derive(Debug, Default)]
pub struct CommitteeCache {
    inner: RwLock<HashMap<u64, Arc<Committee>>>,
}

impl CommitteeCache {
    pub fn get(&self, id: u64) -> Option<Arc<Committee>> {
        self.inner.read().unwrap().get(&id).cloned()
    }

    /// Finds a cached committee covering `fast_number`, probing the epoch of
    /// `snail_number` and its predecessor.
    pub fn lookup(&self, fast_number: u64, snail_number: u64, z: u64) -> Option<Arc<Committee>> {
        let epoch = snail_number / z;
        let list = self.inner.read().unwrap();
        for id in epoch.checked_sub(1).into_iter().chain([epoch]) {
            tracing::debug!(id, "probing committee cache");
            if let Some(committee) = list.get(&id) {
                if committee.covers(fast_number) {
                    return Some(committee.clone());
                }
            }
        }
        None
    }

    /// Inserts the record if its id is absent and returns the cached record
    /// for that id. Existing entries are never replaced.
    pub fn insert(&self, committee: Arc<Committee>) -> Arc<Committee> {
        let mut list = self.inner.write().unwrap();
        list.entry(committee.id()).or_insert(committee).clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}
