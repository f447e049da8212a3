//! Blocks and the append-only chain they form.

use std::{collections::HashMap, fmt};

use rand::RngCore;
use thiserror::Error;

use crate::{
    config::{Environment, Gas, Wei},
    transaction::Transaction,
    utils::to_gwei,
};

/// A unique identifier assigned to each [Block], drawn at random from the
/// run's seeded generator.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct BlockHash([u8; 8]);

impl BlockHash {
    /// Parent hash carried by the first block of a chain.
    pub const GENESIS: BlockHash = BlockHash([0; 8]);

    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 8];
        rng.fill_bytes(&mut bytes);

        BlockHash(bytes)
    }
}

impl From<[u8; 8]> for BlockHash {
    fn from(bytes: [u8; 8]) -> Self {
        BlockHash(bytes)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("block gas {used} exceeds the gas ceiling {limit}")]
    GasLimitExceeded { used: Gas, limit: Gas },
    #[error("block hash {0} already exists on this chain")]
    DuplicateBlock(BlockHash),
}

/// Immutable snapshot of one round: the included transactions and the
/// basefee they were included under. The basefee is fixed at construction
/// and never recomputed.
#[derive(Debug, Clone)]
pub struct Block {
    hash: BlockHash,
    parent_hash: BlockHash,
    height: u64,
    basefee: Wei,
    txs: Vec<Transaction>,
}

impl Block {
    /// Builds a block from the selection auction's winners. Fails if the
    /// winners' total gas exceeds `gas_limit`.
    pub fn new<R: RngCore + ?Sized>(
        txs: Vec<Transaction>,
        parent_hash: BlockHash,
        height: u64,
        basefee: Wei,
        gas_limit: Gas,
        rng: &mut R,
    ) -> Result<Self, ChainError> {
        let used: Gas = txs.iter().map(Transaction::gas_used).sum();
        if used > gas_limit {
            return Err(ChainError::GasLimitExceeded { used, limit: gas_limit });
        }

        Ok(Block {
            hash: BlockHash::random(rng),
            parent_hash,
            height,
            basefee,
            txs,
        })
    }

    #[inline]
    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    #[inline]
    pub fn parent_hash(&self) -> BlockHash {
        self.parent_hash
    }

    #[inline]
    pub fn height(&self) -> u64 {
        self.height
    }

    #[inline]
    pub fn basefee(&self) -> Wei {
        self.basefee
    }

    #[inline]
    pub fn txs(&self) -> &[Transaction] {
        &self.txs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// The environment this block's transactions were priced under.
    pub fn env(&self) -> Environment {
        Environment::new(self.basefee, self.height)
    }

    pub fn gas_used(&self) -> Gas {
        self.txs.iter().map(Transaction::gas_used).sum()
    }

    /// Mean rounds between each transaction's creation and inclusion here.
    /// Zero for an empty block.
    pub fn average_waiting_time(&self) -> f64 {
        if self.txs.is_empty() {
            return 0.0;
        }

        let waited: u64 = self
            .txs
            .iter()
            .map(|tx| self.height.saturating_sub(tx.start_round()))
            .sum();

        waited as f64 / self.txs.len() as f64
    }

    /// Mean miner tip across the block, in Gwei. Zero for an empty block.
    pub fn average_tip(&self) -> f64 {
        if self.txs.is_empty() {
            return 0.0;
        }

        let env = self.env();
        let total: Wei = self.txs.iter().map(|tx| tx.tip(&env)).sum();

        to_gwei(total) / self.txs.len() as f64
    }

    /// Mean price paid across the block, in Gwei. Zero for an empty block.
    pub fn average_gas_price(&self) -> f64 {
        if self.txs.is_empty() {
            return 0.0;
        }

        let env = self.env();
        let total: Wei = self.txs.iter().map(|tx| tx.gas_price(&env)).sum();

        to_gwei(total) / self.txs.len() as f64
    }

    /// Smallest premium field in the block, in wei. Zero for an empty block.
    pub fn min_premium(&self) -> Wei {
        self.txs.iter().map(Transaction::premium).min().unwrap_or(0)
    }

    /// Largest premium field in the block, in wei. Zero for an empty block.
    pub fn max_premium(&self) -> Wei {
        self.txs.iter().map(Transaction::premium).max().unwrap_or(0)
    }

    /// Flattens this block into one export row per transaction.
    pub fn records(&self) -> Vec<TxRecord> {
        let env = self.env();

        self.txs
            .iter()
            .enumerate()
            .map(|(tx_index, tx)| TxRecord {
                block_height: self.height,
                tx_index,
                basefee: to_gwei(self.basefee),
                tx_hash: tx.hash().to_string(),
                sender: tx.sender().to_string(),
                start_round: tx.start_round(),
                gas_used: tx.gas_used(),
                kind: tx.kind().name(),
                gas_price: to_gwei(tx.gas_price(&env)),
                tip: to_gwei(tx.tip(&env)),
                max_fee: tx.max_fee().map(to_gwei),
                premium: to_gwei(tx.premium()),
            })
            .collect()
    }
}

/// One flattened per-transaction row of an included block, priced at the
/// block's own basefee and height. Fee fields are in Gwei. Suitable for
/// tabular analysis; formatting and persistence happen elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct TxRecord {
    pub block_height: u64,
    pub tx_index: usize,
    pub basefee: f64,
    pub tx_hash: String,
    pub sender: String,
    pub start_round: u64,
    pub gas_used: Gas,
    pub kind: &'static str,
    pub gas_price: f64,
    pub tip: f64,
    pub max_fee: Option<f64>,
    pub premium: f64,
}

/// Append-only ledger of [Blocks](Block), keyed by block hash, with a
/// pointer to the most recently added block.
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: HashMap<BlockHash, Block>,
    head: BlockHash,
}

impl Chain {
    /// Creates an empty chain whose head pointer is the genesis hash.
    pub fn new() -> Self {
        Chain { blocks: HashMap::new(), head: BlockHash::GENESIS }
    }

    #[inline]
    pub fn head(&self) -> BlockHash {
        self.head
    }

    #[inline]
    pub fn contains(&self, hash: BlockHash) -> bool {
        self.blocks.contains_key(&hash)
    }

    #[inline]
    pub fn get(&self, hash: BlockHash) -> Option<&Block> {
        self.blocks.get(&hash)
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Adds `block` to the chain and advances the head pointer to it.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        if self.contains(block.hash) {
            return Err(ChainError::DuplicateBlock(block.hash));
        }

        self.head = block.hash;
        self.blocks.insert(block.hash, block);

        Ok(())
    }

    /// Flattens the whole chain into per-transaction export rows, ordered
    /// by block height.
    pub fn export(&self) -> Vec<TxRecord> {
        let mut blocks: Vec<&Block> = self.blocks.values().collect();
        blocks.sort_by_key(|block| block.height);

        blocks.into_iter().flat_map(Block::records).collect()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::config::{GWEI, MAX_GAS, SIMPLE_TX_GAS};
    use crate::transaction::Transaction;
    use crate::user::UserId;

    use super::{Block, BlockHash, Chain, ChainError};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn bid(start_round: u64, premium: u64, rng: &mut StdRng) -> Transaction {
        let sender = UserId::random(rng);
        Transaction::bid_1559(sender, start_round, 10 * GWEI, premium, rng)
    }

    #[test]
    fn block_statistics() {
        let mut rng = rng();
        let txs = vec![bid(1, GWEI, &mut rng), bid(3, 3 * GWEI, &mut rng)];

        let block =
            Block::new(txs, BlockHash::GENESIS, 5, GWEI, MAX_GAS, &mut rng)
                .unwrap();

        assert_eq!(block.gas_used(), 2 * SIMPLE_TX_GAS);
        // Waited 4 and 2 rounds respectively.
        assert_eq!(block.average_waiting_time(), 3.0);
        // Tips of 1 and 3 Gwei over a 1 Gwei basefee.
        assert_eq!(block.average_tip(), 2.0);
        assert_eq!(block.average_gas_price(), 3.0);
        assert_eq!(block.min_premium(), GWEI);
        assert_eq!(block.max_premium(), 3 * GWEI);
    }

    #[test]
    fn empty_block_statistics_are_zero() {
        let mut rng = rng();
        let block =
            Block::new(vec![], BlockHash::GENESIS, 0, GWEI, MAX_GAS, &mut rng)
                .unwrap();

        assert_eq!(block.gas_used(), 0);
        assert_eq!(block.average_waiting_time(), 0.0);
        assert_eq!(block.average_tip(), 0.0);
        assert_eq!(block.min_premium(), 0);
    }

    #[test]
    fn oversized_block_is_rejected() {
        let mut rng = rng();
        let txs = vec![bid(0, GWEI, &mut rng), bid(0, GWEI, &mut rng)];

        let result =
            Block::new(txs, BlockHash::GENESIS, 0, GWEI, SIMPLE_TX_GAS, &mut rng);
        assert!(matches!(result, Err(ChainError::GasLimitExceeded { .. })));
    }

    #[test]
    fn append_advances_head() {
        let mut rng = rng();
        let mut chain = Chain::new();
        assert_eq!(chain.head(), BlockHash::GENESIS);

        let block =
            Block::new(vec![], chain.head(), 0, GWEI, MAX_GAS, &mut rng).unwrap();
        let hash = block.hash();

        chain.append(block).unwrap();
        assert_eq!(chain.head(), hash);
        assert_eq!(chain.num_blocks(), 1);
        assert_eq!(chain.get(hash).unwrap().parent_hash(), BlockHash::GENESIS);
    }

    #[test]
    fn duplicate_block_is_rejected() {
        let mut rng = rng();
        let mut chain = Chain::new();

        let block =
            Block::new(vec![], chain.head(), 0, GWEI, MAX_GAS, &mut rng).unwrap();
        let copy = block.clone();

        chain.append(block).unwrap();
        assert!(matches!(
            chain.append(copy),
            Err(ChainError::DuplicateBlock(_))
        ));
    }

    #[test]
    fn export_flattens_blocks_in_height_order() {
        let mut rng = rng();
        let mut chain = Chain::new();

        for height in 0..3 {
            let txs = vec![bid(height, GWEI, &mut rng)];
            let block =
                Block::new(txs, chain.head(), height, GWEI, MAX_GAS, &mut rng)
                    .unwrap();
            chain.append(block).unwrap();
        }

        let records = chain.export();
        assert_eq!(records.len(), 3);
        let heights: Vec<u64> =
            records.iter().map(|r| r.block_height).collect();
        assert_eq!(heights, vec![0, 1, 2]);
        assert_eq!(records[0].kind, "1559");
        assert_eq!(records[0].tx_index, 0);
    }
}
