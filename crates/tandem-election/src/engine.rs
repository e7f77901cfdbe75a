//! The election engine: owns the committee schedule for the fast chain.
//!
//! A single background task watches both chain heads. Snail-head events at
//! the switch-check height elect the next committee and seal the current
//! one's fast range; the fast-head event that reaches the sealed end swaps
//! the committees and notifies subscribers. Queries run on caller tasks
//! against an atomic snapshot of the switchover state and the committee
//! cache, falling back to on-demand computation from snail history.

use crate::candidate::candidates_from_range;
use crate::chain::{
    DifficultyEngine, FastChainHeadEvent, FastchainReader, SnailChainHeadEvent, SnailchainReader,
};
use crate::committee::{Committee, CommitteeCache};
use crate::epoch::EpochBoundary;
use crate::error::ElectionError;
use crate::lottery::elect;
use arc_swap::ArcSwap;
use metrics::{counter, gauge};
use std::sync::{Arc, OnceLock};
use tandem_chainspec::ElectionParams;
use tandem_primitives::{CommitteeMember, ElectionEvent, ElectionOption, FastBlock, SnailBlock};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Buffered election events per subscriber.
const ELECTION_EVENT_BUFFER: usize = 256;

/// Snapshot of the switchover state machine. Swapped whole so queries never
/// observe a torn `current`/`next`/`switching` triple.
#[derive(Debug, Default)]
struct SwitchState {
    current: Option<Arc<Committee>>,
    /// Pre-elected committee awaiting switchover; present iff `switching`.
    next: Option<Arc<Committee>>,
    switching: bool,
}

/// The committee election engine.
///
/// Cheap to clone; all clones share one engine instance. Queries may run
/// from any task. `start` spawns the event loop onto the current tokio
/// runtime; the loop exits when both chain-head subscriptions are dropped.
pub struct Election<S, F, E> {
    inner: Arc<Inner<S, F, E>>,
}

impl<S, F, E> Clone for Election<S, F, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

struct Inner<S, F, E> {
    params: ElectionParams,
    genesis_committee: Vec<CommitteeMember>,
    cache: CommitteeCache,
    state: ArcSwap<SwitchState>,
    event_tx: broadcast::Sender<ElectionEvent>,
    snailchain: Arc<S>,
    fastchain: Arc<F>,
    engine: OnceLock<Arc<E>>,
}

impl<S, F, E> Election<S, F, E>
where
    S: SnailchainReader,
    F: FastchainReader,
    E: DifficultyEngine,
{
    /// Creates the engine over the two chain stores. The genesis committee
    /// is read from the snail chain once, at construction.
    pub fn new(fastchain: Arc<F>, snailchain: Arc<S>, params: ElectionParams) -> Self {
        let genesis_committee = snailchain.genesis_committee();
        let (event_tx, _) = broadcast::channel(ELECTION_EVENT_BUFFER);
        Self {
            inner: Arc::new(Inner {
                params,
                genesis_committee,
                cache: CommitteeCache::default(),
                state: ArcSwap::from_pointee(SwitchState::default()),
                event_tx,
                snailchain,
                fastchain,
                engine: OnceLock::new(),
            }),
        }
    }

    /// Configures the PoW consensus engine used as the difficulty oracle.
    /// Must happen before [`start`](Self::start); later calls are ignored.
    pub fn set_engine(&self, engine: E) {
        if self.inner.engine.set(Arc::new(engine)).is_err() {
            warn!("consensus engine already configured, ignoring");
        }
    }

    pub fn params(&self) -> &ElectionParams {
        &self.inner.params
    }

    /// Subscribes to committee lifecycle events. Emission never blocks the
    /// event loop; a slow subscriber observes a lag error, not back-pressure.
    pub fn subscribe_election_events(&self) -> broadcast::Receiver<ElectionEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Returns the committee members authorized to propose the given fast
    /// block, or `None` while the answer is not derivable (height beyond
    /// `head + k`, or the backing snail history is unavailable).
    pub fn get_committee(&self, fast_number: u64) -> Option<Vec<CommitteeMember>> {
        debug!(fast_number, "get committee");
        if fast_number == 0 {
            // fast heights are 1-indexed
            return None;
        }
        let fast_head = self.inner.fastchain.current_header().number;
        let snail_head = self.inner.snailchain.current_header().number;
        let k = self.inner.params.k;
        if fast_number > fast_head + k {
            info!(fast_number, current = fast_head, "get committee failed, beyond head lag");
            return None;
        }

        let state = self.inner.state.load();
        if let Some(next) = &state.next {
            debug!(id = next.id(), begin = next.begin_fast_number(), "next committee info");
            if next.begin_fast_number() + k < fast_number {
                info!(
                    fast_number,
                    next_begin = next.begin_fast_number(),
                    "get committee failed, beyond next committee lag"
                );
                return None;
            }
            if fast_number >= next.begin_fast_number() {
                return Some(next.members());
            }
        }
        if let Some(current) = &state.current {
            debug!(id = current.id(), begin = current.begin_fast_number(), "current committee info");
            if fast_number >= current.begin_fast_number() {
                return Some(current.members());
            }
        }
        drop(state);

        // historical height: resolve its snail position and rebuild
        let Some(fast_block) = self.inner.fastchain.block_by_number(fast_number) else {
            info!(fast_number, current = fast_head, "get committee failed, no fast block");
            return None;
        };
        let snail_number = self
            .inner
            .snailchain
            .fruit_by_fast_hash(fast_block.hash())
            .map(|fruit| fruit.snail_number())
            .unwrap_or(snail_head);

        if let Some(committee) = self.inner.cache.lookup(fast_number, snail_number, self.inner.params.z)
        {
            return Some(committee.members());
        }

        let committee = Arc::new(self.inner.compute_committee(fast_number, snail_number)?);
        let committee = self.inner.cache.insert(committee);
        Some(committee.members())
    }

    /// Returns a committee's members by epoch id, checking the live
    /// current/next pair before the cache.
    pub fn get_committee_by_id(&self, id: u64) -> Option<Vec<CommitteeMember>> {
        let state = self.inner.state.load();
        if let Some(current) = &state.current {
            if current.id() == id {
                return Some(current.members());
            }
        }
        if let Some(next) = &state.next {
            if next.id() == id {
                return Some(next.members());
            }
        }
        drop(state);

        self.inner.cache.get(id).map(|committee| committee.members())
    }

    /// Replays the committee schedule from the current chain heads, emits
    /// the startup events, and spawns the event loop. Requires a configured
    /// consensus engine and a running tokio runtime.
    pub fn start(&self) -> Result<(), ElectionError> {
        if self.inner.engine.get().is_none() {
            return Err(ElectionError::EngineNotSet);
        }

        // subscribe before reading heads so no boundary event is missed
        let snail_rx = self.inner.snailchain.subscribe_chain_head();
        let fast_rx = self.inner.fastchain.subscribe_chain_head();

        let fast_head = self.inner.fastchain.current_header().number;
        let snail_head = self.inner.snailchain.current_header().number;

        let Some(current) = self.inner.compute_committee(fast_head, snail_head) else {
            warn!(fast_head, snail_head, "no committee computable at startup");
            return Ok(());
        };
        let mut current = self.inner.cache.insert(Arc::new(current));
        let mut next: Option<Arc<Committee>> = None;
        let mut switching = false;

        if current.end_fast_number() != 0 {
            // started past the switchover point: the next committee is
            // already due, elect it from the following snail window
            let elect_end = current.last_election_number() + self.inner.params.z;
            let elect_begin = elect_end - self.inner.params.z + 1;
            match self.inner.elect_committee(elect_begin, elect_end) {
                Some(members) => {
                    let committee = Committee::new(
                        elect_begin,
                        current.end_fast_number() + 1,
                        0,
                        elect_begin,
                        elect_end,
                        current.switch_check_number() + self.inner.params.z,
                        members,
                    );
                    next = Some(self.inner.cache.insert(Arc::new(committee)));
                    switching = true;
                }
                None => {
                    warn!(
                        first = elect_begin,
                        last = elect_end,
                        "next committee election unavailable at startup"
                    );
                }
            }

            if switching && current.end_fast_number() == fast_head {
                // the old committee already finished its range
                if let Some(promoted) = next.take() {
                    current = promoted;
                    switching = false;
                }
            }
        }

        self.inner.state.store(Arc::new(SwitchState {
            current: Some(current.clone()),
            next: next.clone(),
            switching,
        }));
        gauge!("election_current_committee_id").set(current.id() as f64);
        info!(id = current.id(), begin = current.begin_fast_number(), "election started");

        self.inner.emit(ElectionEvent {
            option: ElectionOption::Switchover,
            committee_id: current.id(),
            members: current.members(),
            begin_fast_number: None,
        });
        self.inner.emit(ElectionEvent {
            option: ElectionOption::Start,
            committee_id: current.id(),
            members: current.members(),
            begin_fast_number: Some(current.begin_fast_number()),
        });
        if switching {
            if let Some(next) = &next {
                self.inner.emit(ElectionEvent {
                    option: ElectionOption::Switchover,
                    committee_id: next.id(),
                    members: next.members(),
                    begin_fast_number: None,
                });
            }
        }

        tokio::spawn(Inner::run(self.inner.clone(), snail_rx, fast_rx));

        Ok(())
    }
}

impl<S, F, E> Inner<S, F, E>
where
    S: SnailchainReader,
    F: FastchainReader,
    E: DifficultyEngine,
{
    /// Event loop: reacts to heads of both chains until both subscriptions
    /// close. Sole writer of the switchover state.
    async fn run(
        self: Arc<Self>,
        mut snail_rx: broadcast::Receiver<SnailChainHeadEvent>,
        mut fast_rx: broadcast::Receiver<FastChainHeadEvent>,
    ) {
        use broadcast::error::RecvError;

        info!("election event loop started");

        let mut snail_open = true;
        let mut fast_open = true;
        while snail_open || fast_open {
            tokio::select! {
                event = snail_rx.recv(), if snail_open => match event {
                    Ok(event) => self.on_snail_head(&event.block),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "snail chain head subscription lagged");
                    }
                    Err(RecvError::Closed) => snail_open = false,
                },
                event = fast_rx.recv(), if fast_open => match event {
                    Ok(event) => self.on_fast_head(&event.block),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "fast chain head subscription lagged");
                    }
                    Err(RecvError::Closed) => fast_open = false,
                },
            }
        }

        info!("chain head subscriptions closed, election event loop exiting");
    }

    /// Epoch-boundary check: electing the next committee when the snail
    /// chain reaches the current committee's switch-check height.
    fn on_snail_head(&self, block: &SnailBlock) {
        let state = self.state.load_full();
        let Some(current) = state.current.clone() else {
            return;
        };
        if current.switch_check_number() != block.number() {
            return;
        }

        let end = block.number() - self.params.lamada;
        let start = if end < self.params.z { 1 } else { end - self.params.z };

        let Some(members) = self.elect_committee(start, end) else {
            warn!(snail = block.number(), "election trigger skipped, retrying on later blocks");
            return;
        };
        let Some(end_block) = self.snailchain.block_by_number(end) else {
            warn!(snail = end, "switch-check window end block missing, trigger skipped");
            return;
        };
        let Some(last_fruit) = end_block.fruits().last() else {
            warn!(snail = end, "switch-check window end block has no fruits, trigger skipped");
            return;
        };

        let end_fast = last_fruit.fast_number() + self.params.k;
        current.seal_end_fast(end_fast);
        info!(snail = block.number(), end_fast, "committee election switchover started");

        let next = Arc::new(Committee::new(
            start,
            end_fast + 1,
            0,
            start,
            end,
            current.switch_check_number() + self.params.z,
            members,
        ));
        let next = self.cache.insert(next);
        debug_assert_eq!(next.begin_fast_number(), current.end_fast_number() + 1);

        self.state.store(Arc::new(SwitchState {
            current: Some(current),
            next: Some(next.clone()),
            switching: true,
        }));
        counter!("election_switchovers_total").increment(1);
        info!(id = next.id(), begin = next.begin_fast_number(), "switchover to new committee");

        self.emit(ElectionEvent {
            option: ElectionOption::Switchover,
            committee_id: next.id(),
            members: next.members(),
            begin_fast_number: None,
        });
    }

    /// End-of-epoch check: swapping next into current once the fast chain
    /// seals the old committee's last block.
    fn on_fast_head(&self, block: &FastBlock) {
        let state = self.state.load_full();
        if !state.switching {
            return;
        }
        let (Some(current), Some(next)) = (state.current.clone(), state.next.clone()) else {
            return;
        };
        if current.end_fast_number() != block.number() {
            return;
        }

        info!(id = current.id(), "stopping committee");
        self.emit(ElectionEvent {
            option: ElectionOption::Stop,
            committee_id: current.id(),
            members: current.members(),
            begin_fast_number: None,
        });

        self.state.store(Arc::new(SwitchState {
            current: Some(next.clone()),
            next: None,
            switching: false,
        }));
        gauge!("election_current_committee_id").set(next.id() as f64);
        info!(id = next.id(), begin = next.begin_fast_number(), "starting new committee");

        self.emit(ElectionEvent {
            option: ElectionOption::Start,
            committee_id: next.id(),
            members: next.members(),
            begin_fast_number: Some(next.begin_fast_number()),
        });
    }

    /// Maps a (fast, snail) height pair to the committee record owning that
    /// fast height, electing from snail history as needed. `None` when the
    /// backing snail blocks are not yet available.
    fn compute_committee(&self, fast_number: u64, snail_number: u64) -> Option<Committee> {
        info!(fast_number, snail_number, "computing committee");
        let boundary = EpochBoundary::of(snail_number, &self.params);
        debug!(
            epoch = boundary.epoch,
            last = boundary.last_snail,
            switch_check = boundary.switch_check,
            "epoch position"
        );

        if boundary.epoch == 0 {
            debug!("genesis committee");
            return Some(self.genesis_record(0));
        }

        // the last fast block of the previous epoch follows from the last
        // fruit of the switch-check block
        let switch_block = self.snailchain.block_by_number(boundary.switch_check)?;
        let last_fruit = switch_block.fruits().last()?;
        let last_fast = last_fruit.fast_number() + self.params.k;

        debug!(epoch = boundary.epoch, last_fast, fast_number, "checking last fast block");
        if last_fast >= fast_number {
            if boundary.epoch == 1 {
                // still under the genesis committee, now with a sealed range
                debug!("genesis committee");
                return Some(self.genesis_record(last_fast));
            }
            // the previous epoch's committee owns this height
            let end = boundary.switch_check - self.params.z;
            let begin = (end + 1).saturating_sub(self.params.z).max(1);
            let end_block = self.snailchain.block_by_number(end)?;
            let pre_fruit = end_block.fruits().last()?;
            let pre_end_fast = pre_fruit.fast_number() + self.params.k;

            debug!(first = begin, last = end, last_fast, "electing previous epoch committee");
            let members = self.elect_committee(begin, end)?;
            return Some(Committee::new(
                boundary.epoch - 1,
                pre_end_fast + 1,
                last_fast,
                begin,
                end,
                boundary.last_snail,
                members,
            ));
        }

        // current epoch: elect from the switch-check window
        let end = boundary.switch_check;
        let begin = (end + 1).checked_sub(self.params.z)?;

        debug!(first = begin, last = end, last_fast, "electing current epoch committee");
        let members = self.elect_committee(begin, end)?;
        Some(Committee::new(
            boundary.epoch,
            last_fast + 1,
            0,
            begin,
            end,
            boundary.last_snail + self.params.z,
            members,
        ))
    }

    /// The genesis committee record; `end_fast` is 0 while epoch 0 is still
    /// open and the sealed range once epoch 1 has begun.
    fn genesis_record(&self, end_fast: u64) -> Committee {
        Committee::new(0, 1, end_fast, 0, 0, self.params.z, self.genesis_committee.clone())
    }

    /// Runs a full election over the inclusive snail range.
    fn elect_committee(&self, begin: u64, end: u64) -> Option<Vec<CommitteeMember>> {
        let Some(engine) = self.engine.get() else {
            error!("consensus engine not configured, cannot elect");
            return None;
        };
        info!(
            first = begin,
            last = end,
            threshold = self.params.fruit_threshold,
            min = self.params.min_committee,
            max = self.params.max_committee,
            "electing new committee"
        );
        let (seed, candidates) = candidates_from_range(
            self.snailchain.as_ref(),
            engine.as_ref(),
            &self.params,
            begin,
            end,
        )?;
        counter!("election_elections_total").increment(1);
        Some(elect(&candidates, seed, &self.params))
    }

    /// Fans an event out to subscribers; a send with no subscribers is not
    /// an error.
    fn emit(&self, event: ElectionEvent) {
        let _ = self.event_tx.send(event);
    }
}
