//! Narrow interfaces the election engine consumes from the two chain
//! modules and the PoW consensus engine.
//!
//! The engine holds the chain stores as shared handles and never outlives
//! them; block storage, fork choice, and propagation are entirely the chain
//! modules' concern. Head events arrive over broadcast channels in chain
//! order; the engine's event loop exits once both senders are dropped.

use alloy_primitives::{B256, U256};
use std::sync::Arc;
use tandem_primitives::{
    CommitteeMember, FastBlock, FastHeader, Fruit, FruitHeader, SnailBlock, SnailHeader,
};
use tokio::sync::broadcast;

/// New head on the snail chain.
#[derive(Clone, Debug)]
pub struct SnailChainHeadEvent {
    pub block: Arc<SnailBlock>,
}

/// New head on the fast chain.
#[derive(Clone, Debug)]
pub struct FastChainHeadEvent {
    pub block: Arc<FastBlock>,
}

/// Read access to the snail chain.
pub trait SnailchainReader: Send + Sync + 'static {
    fn current_header(&self) -> SnailHeader;

    /// Returns `None` while the block has not been received; callers treat
    /// that as transient and retry on a later chain event.
    fn block_by_number(&self, number: u64) -> Option<Arc<SnailBlock>>;

    /// Looks up the fruit certifying the fast block with the given hash.
    fn fruit_by_fast_hash(&self, fast_hash: B256) -> Option<Fruit>;

    /// The bootstrap committee fixed by snail-chain genesis.
    fn genesis_committee(&self) -> Vec<CommitteeMember>;

    fn subscribe_chain_head(&self) -> broadcast::Receiver<SnailChainHeadEvent>;
}

/// Read access to the fast chain.
pub trait FastchainReader: Send + Sync + 'static {
    fn current_header(&self) -> FastHeader;

    fn block_by_number(&self, number: u64) -> Option<Arc<FastBlock>>;

    fn subscribe_chain_head(&self) -> broadcast::Receiver<FastChainHeadEvent>;
}

/// Difficulty oracle of the PoW consensus engine.
pub trait DifficultyEngine: Send + Sync + 'static {
    /// Returns `(actual, target)` difficulty for a fruit header. A valid
    /// fruit satisfies `actual >= target`; the excess is its election weight.
    fn get_difficulty(&self, header: &FruitHeader) -> (U256, U256);
}
