//! End-to-end tests of the election engine over in-memory chain stores.

use alloy_primitives::{Address, B256, U256};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tandem_chainspec::ElectionParams;
use tandem_election::{
    candidates_from_range, elect, DifficultyEngine, Election, ElectionError, FastChainHeadEvent,
    FastchainReader, SnailChainHeadEvent, SnailchainReader,
};
use tandem_primitives::crypto::{encode_pubkey, SigningKey};
use tandem_primitives::{
    pubkey_to_address, CommitteeMember, ConsensusSign, ElectionEvent, ElectionOption, FastBlock,
    FastHeader, Fruit, FruitHeader, SnailBlock, SnailHeader,
};
use tokio::sync::broadcast;

/// Fast blocks certified per snail block in the fixture chains.
const FRUITS_PER_BLOCK: u64 = 2;

fn test_params() -> ElectionParams {
    ElectionParams { z: 20, k: 5, lamada: 12, ..ElectionParams::default() }
}

fn test_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).expect("valid scalar")
}

fn member_for(key: &SigningKey) -> CommitteeMember {
    let public_key = encode_pubkey(key.verifying_key());
    CommitteeMember { coinbase: pubkey_to_address(&public_key), public_key }
}

struct MockSnailchain {
    blocks: RwLock<BTreeMap<u64, Arc<SnailBlock>>>,
    genesis: Vec<CommitteeMember>,
    head_tx: broadcast::Sender<SnailChainHeadEvent>,
}

impl MockSnailchain {
    fn new(genesis: Vec<CommitteeMember>) -> Self {
        let (head_tx, _) = broadcast::channel(64);
        Self { blocks: RwLock::new(BTreeMap::new()), genesis, head_tx }
    }

    fn insert(&self, block: SnailBlock) -> Arc<SnailBlock> {
        let block = Arc::new(block);
        self.blocks.write().unwrap().insert(block.number(), block.clone());
        block
    }

    fn remove(&self, number: u64) {
        self.blocks.write().unwrap().remove(&number);
    }

    fn push_head(&self, block: Arc<SnailBlock>) {
        self.head_tx.send(SnailChainHeadEvent { block }).expect("loop subscribed");
    }
}

impl SnailchainReader for MockSnailchain {
    fn current_header(&self) -> SnailHeader {
        let blocks = self.blocks.read().unwrap();
        blocks.values().next_back().expect("snail chain not empty").header().clone()
    }

    fn block_by_number(&self, number: u64) -> Option<Arc<SnailBlock>> {
        self.blocks.read().unwrap().get(&number).cloned()
    }

    fn fruit_by_fast_hash(&self, fast_hash: B256) -> Option<Fruit> {
        let blocks = self.blocks.read().unwrap();
        blocks
            .values()
            .flat_map(|block| block.fruits())
            .find(|fruit| fruit.fast_hash() == fast_hash)
            .cloned()
    }

    fn genesis_committee(&self) -> Vec<CommitteeMember> {
        self.genesis.clone()
    }

    fn subscribe_chain_head(&self) -> broadcast::Receiver<SnailChainHeadEvent> {
        self.head_tx.subscribe()
    }
}

struct MockFastchain {
    blocks: RwLock<BTreeMap<u64, Arc<FastBlock>>>,
    head_tx: broadcast::Sender<FastChainHeadEvent>,
}

impl MockFastchain {
    fn new() -> Self {
        let (head_tx, _) = broadcast::channel(64);
        Self { blocks: RwLock::new(BTreeMap::new()), head_tx }
    }

    fn insert(&self, number: u64) -> Arc<FastBlock> {
        let block = Arc::new(FastBlock::new(FastHeader {
            number,
            parent_hash: B256::ZERO,
            timestamp: number,
        }));
        self.blocks.write().unwrap().insert(number, block.clone());
        block
    }

    fn push_head(&self, block: Arc<FastBlock>) {
        self.head_tx.send(FastChainHeadEvent { block }).expect("loop subscribed");
    }
}

impl FastchainReader for MockFastchain {
    fn current_header(&self) -> FastHeader {
        let blocks = self.blocks.read().unwrap();
        blocks.values().next_back().expect("fast chain not empty").header().clone()
    }

    fn block_by_number(&self, number: u64) -> Option<Arc<FastBlock>> {
        self.blocks.read().unwrap().get(&number).cloned()
    }

    fn subscribe_chain_head(&self) -> broadcast::Receiver<FastChainHeadEvent> {
        self.head_tx.subscribe()
    }
}

struct MockEngine;

impl DifficultyEngine for MockEngine {
    fn get_difficulty(&self, header: &FruitHeader) -> (U256, U256) {
        (header.fruit_difficulty, U256::ZERO)
    }
}

struct Fixture {
    params: ElectionParams,
    snail: Arc<MockSnailchain>,
    fast: Arc<MockFastchain>,
    genesis_keys: Vec<SigningKey>,
    genesis: Vec<CommitteeMember>,
    miners: Vec<SigningKey>,
}

impl Fixture {
    /// Builds interlocked chains: snail block `n` carries fruits certifying
    /// fast blocks `(n-1)*FRUITS_PER_BLOCK + 1 ..= n*FRUITS_PER_BLOCK`.
    /// Snail blocks at `fruitless_from` and above carry no fruits.
    fn new(snail_head: u64, fast_head: u64, fruitless_from: Option<u64>) -> Self {
        let genesis_keys: Vec<SigningKey> = (0xA1u8..0xA4).map(test_key).collect();
        let genesis: Vec<CommitteeMember> = genesis_keys.iter().map(member_for).collect();
        let miners: Vec<SigningKey> = (0xB1u8..0xB4).map(test_key).collect();

        let fast = Arc::new(MockFastchain::new());
        for number in 0..=fast_head {
            fast.insert(number);
        }

        let fx = Self {
            params: test_params(),
            snail: Arc::new(MockSnailchain::new(genesis.clone())),
            fast,
            genesis_keys,
            genesis,
            miners,
        };
        for number in 0..=snail_head {
            let fruitless = fruitless_from.is_some_and(|from| number >= from);
            fx.snail.insert(fx.snail_block(number, fruitless));
        }
        fx
    }

    fn snail_block(&self, number: u64, fruitless: bool) -> SnailBlock {
        let fruits = if number == 0 || fruitless {
            Vec::new()
        } else {
            (0..FRUITS_PER_BLOCK)
                .map(|i| {
                    let fast_number = (number - 1) * FRUITS_PER_BLOCK + i + 1;
                    let fast_hash = self
                        .fast
                        .block_by_number(fast_number)
                        .map(|block| block.hash())
                        .unwrap_or_default();
                    let key = &self.miners[fast_number as usize % self.miners.len()];
                    let pubkey = encode_pubkey(key.verifying_key());
                    Fruit::new(FruitHeader {
                        snail_number: number,
                        fast_number,
                        fast_hash,
                        to_elect: true,
                        coinbase: pubkey_to_address(&pubkey),
                        pubkey,
                        fruit_difficulty: U256::from(10),
                    })
                })
                .collect()
        };
        SnailBlock::new(
            SnailHeader {
                number,
                parent_hash: B256::ZERO,
                coinbase: Address::ZERO,
                pow_difficulty: U256::from(1000),
                timestamp: number,
            },
            fruits,
        )
    }

    fn election(&self) -> Election<MockSnailchain, MockFastchain, MockEngine> {
        let election = Election::new(self.fast.clone(), self.snail.clone(), self.params.clone());
        election.set_engine(MockEngine);
        election
    }

    /// The miner key behind an elected member.
    fn miner_for(&self, member: &CommitteeMember) -> &SigningKey {
        self.miners
            .iter()
            .find(|key| encode_pubkey(key.verifying_key()) == member.public_key)
            .expect("member was elected from the fixture miners")
    }

    fn fast_hash(&self, number: u64) -> B256 {
        self.fast
            .block_by_number(number)
            .map(|block| block.hash())
            .unwrap_or_else(|| B256::repeat_byte(0x77))
    }
}

async fn next_event(events: &mut broadcast::Receiver<ElectionEvent>) -> ElectionEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event within timeout")
        .expect("event channel open")
}

/// Drives a fixture through the first epoch boundary and returns the engine,
/// the event stream (positioned after the boundary switchover), and the
/// next committee's members.
async fn switched_over(
    fx: &Fixture,
) -> (
    Election<MockSnailchain, MockFastchain, MockEngine>,
    broadcast::Receiver<ElectionEvent>,
    Vec<CommitteeMember>,
) {
    let election = fx.election();
    let mut events = election.subscribe_election_events();
    election.start().expect("start");

    let switchover = next_event(&mut events).await;
    assert_eq!(switchover.option, ElectionOption::Switchover);
    assert_eq!(switchover.committee_id, 0);
    let start = next_event(&mut events).await;
    assert_eq!(start.option, ElectionOption::Start);
    assert_eq!(start.begin_fast_number, Some(1));

    let boundary = fx.snail.insert(fx.snail_block(20, false));
    fx.snail.push_head(boundary);

    let switchover = next_event(&mut events).await;
    assert_eq!(switchover.option, ElectionOption::Switchover);
    assert_eq!(switchover.committee_id, 1, "next committee id is the election start height");
    assert_eq!(switchover.begin_fast_number, None);
    assert!(!switchover.members.is_empty());

    (election, events, switchover.members)
}

#[tokio::test]
async fn genesis_steady_state() {
    let fx = Fixture::new(8, 5, None);
    let election = fx.election();
    election.start().expect("start");

    assert_eq!(
        election.get_committee(5),
        Some(fx.genesis.clone()),
        "epoch 0 is owned by the genesis committee"
    );
    assert_eq!(election.get_committee_by_id(0), Some(fx.genesis.clone()));
}

#[tokio::test]
async fn fast_height_bounds() {
    let fx = Fixture::new(8, 5, None);
    let election = fx.election();
    election.start().expect("start");

    assert_eq!(election.get_committee(0), None, "fast heights are 1-indexed");
    assert_eq!(
        election.get_committee(5 + fx.params.k + 1),
        None,
        "heights beyond head + k are unknowable"
    );
    assert!(election.get_committee(5 + fx.params.k).is_some(), "head + k is still served");
}

#[tokio::test]
async fn first_epoch_boundary_switchover() {
    let fx = Fixture::new(19, 18, None);
    let (election, _events, next_members) = switched_over(&fx).await;

    // the boundary block is 20; its switch-check window ends at snail 8,
    // whose last fruit certifies fast 16, so the genesis committee seals at
    // 16 + k and the next committee begins right after
    assert_eq!(election.get_committee(21), Some(fx.genesis.clone()));
    assert_eq!(election.get_committee(22), Some(next_members.clone()));
    assert_eq!(election.get_committee_by_id(1), Some(next_members));
}

#[tokio::test]
async fn switchover_completion_on_fast_head() {
    let fx = Fixture::new(19, 18, None);
    let (election, mut events, next_members) = switched_over(&fx).await;

    // a fast head below the sealed end changes nothing
    for number in 19..=20 {
        fx.fast.push_head(fx.fast.insert(number));
    }
    fx.fast.push_head(fx.fast.insert(21));

    let stop = next_event(&mut events).await;
    assert_eq!(stop.option, ElectionOption::Stop);
    assert_eq!(stop.committee_id, 0);
    assert_eq!(stop.members, fx.genesis);

    let start = next_event(&mut events).await;
    assert_eq!(start.option, ElectionOption::Start);
    assert_eq!(start.committee_id, 1);
    assert_eq!(start.begin_fast_number, Some(22));
    assert_eq!(start.members, next_members);

    // the promoted committee serves its range; historical heights are
    // reconstructed from the cache
    assert_eq!(election.get_committee(23), Some(next_members));
    assert_eq!(election.get_committee(5), Some(fx.genesis.clone()));
    assert_eq!(election.get_committee_by_id(0), Some(fx.genesis.clone()));
}

#[tokio::test]
async fn historical_query_rebuilds_and_caches() {
    // snail head 45 (epoch 2), fruits only up to snail 28; queries run with
    // no started engine, straight through the on-demand path
    let fx = Fixture::new(45, 90, Some(29));
    let election = fx.election();

    let members = election.get_committee(81).expect("current epoch committee");
    let again = election.get_committee(81).expect("served from cache");
    assert_eq!(members, again, "repeated queries are byte-identical");

    // the elected members must match an independent recomputation of the
    // same snail window (epoch 2 elects from [9, 28])
    let (seed, candidates) =
        candidates_from_range(fx.snail.as_ref(), &MockEngine, &fx.params, 9, 28)
            .expect("window available");
    assert_eq!(members, elect(&candidates, seed, &fx.params));

    // removing a window block proves the second answer came from the cache
    fx.snail.remove(20);
    assert_eq!(election.get_committee(81), Some(members));

    let cold = fx.election();
    assert_eq!(
        cold.get_committee(81),
        None,
        "an uncached engine cannot elect without the window block"
    );
}

#[tokio::test]
async fn historical_query_previous_epoch_committee() {
    let fx = Fixture::new(45, 90, Some(29));
    let election = fx.election();

    // fast 60 has no certifying fruit, so its snail position falls back to
    // the snail head (epoch 2) and lands in the previous epoch's range
    let members = election.get_committee(60).expect("previous epoch committee");

    let (seed, candidates) =
        candidates_from_range(fx.snail.as_ref(), &MockEngine, &fx.params, 1, 8)
            .expect("window available");
    assert_eq!(members, elect(&candidates, seed, &fx.params));
}

#[tokio::test]
async fn election_is_deterministic_across_engines() {
    let fx = Fixture::new(45, 90, Some(29));

    let first = fx.election().get_committee(81).expect("committee");
    let second = fx.election().get_committee(81).expect("committee");
    assert_eq!(first, second, "independent engines over the same chains agree");
}

#[tokio::test]
async fn verify_sign_round_trip() {
    let fx = Fixture::new(8, 5, None);
    let election = fx.election();
    election.start().expect("start");

    let height = 4;
    let sign = ConsensusSign::signed(&fx.genesis_keys[1], height, fx.fast_hash(height), 1)
        .expect("signing");
    let member = election.verify_sign(&sign).expect("member vote verifies");
    assert_eq!(member, fx.genesis[1]);

    let outsider = ConsensusSign::signed(&test_key(0xEE), height, fx.fast_hash(height), 1)
        .expect("signing");
    assert_eq!(election.verify_sign(&outsider), Err(ElectionError::InvalidMember));

    let mut garbage = sign.clone();
    garbage.sign = vec![0xFF; 65].into();
    assert_eq!(election.verify_sign(&garbage), Err(ElectionError::InvalidSign));

    let beyond = ConsensusSign::signed(&fx.genesis_keys[0], 100, B256::ZERO, 1).expect("signing");
    assert_eq!(
        election.verify_sign(&beyond),
        Err(ElectionError::Committee),
        "no committee exists beyond head + k"
    );
}

#[tokio::test]
async fn batch_verification_is_positional() {
    let fx = Fixture::new(19, 18, None);
    let (election, _events, next_members) = switched_over(&fx).await;
    let next_key = fx.miner_for(&next_members[0]);

    // 80 votes by the current committee, 10 by the next committee for
    // heights after the switchover, 10 malformed
    let mut signs = Vec::new();
    for i in 0..80u64 {
        let height = i % 21 + 1;
        let key = &fx.genesis_keys[i as usize % fx.genesis_keys.len()];
        signs.push(ConsensusSign::signed(key, height, fx.fast_hash(height), 1).unwrap());
    }
    for i in 0..10u64 {
        let height = 22 + i % 2;
        signs.push(ConsensusSign::signed(next_key, height, fx.fast_hash(height), 1).unwrap());
    }
    for _ in 0..10 {
        let mut sign = ConsensusSign::signed(&fx.genesis_keys[0], 3, fx.fast_hash(3), 1).unwrap();
        sign.sign = vec![0xFF; 65].into();
        signs.push(sign);
    }

    let (members, errors) = election.verify_signs(&signs);
    assert_eq!(members.len(), 100);
    assert_eq!(errors.len(), 100);

    for i in 0..80 {
        assert!(members[i].is_some(), "current committee vote {i} should resolve");
        assert!(errors[i].is_none());
    }
    for i in 80..90 {
        assert_eq!(members[i].as_ref(), Some(&next_members[0]), "next committee vote {i}");
        assert!(errors[i].is_none());
    }
    for i in 90..100 {
        assert!(members[i].is_none(), "malformed vote {i} must not resolve");
        assert_eq!(errors[i], Some(ElectionError::InvalidSign));
    }
}
