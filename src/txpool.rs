//! The pending-transaction pool and the per-round selection auction.

use std::collections::HashMap;

use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

use crate::{
    config::{Environment, Gas, Wei},
    transaction::{Transaction, TxHash},
    userpool::{RegistryError, UserPool},
    utils::to_gwei,
};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("transaction {0} is not in the pool")]
    UnknownTransaction(TxHash),
}

/// Holds every pending, not-yet-included transaction.
///
/// Backed by an arena: a dense vector of transactions plus a map from hash
/// to vector index, so lookup is O(1) without hashing on the hot path and
/// removal is a swap-remove. Iteration order is the (deterministic)
/// insertion order; the selection auction shuffles before ranking, so
/// insertion order never leaks into tie-breaking.
#[derive(Debug, Clone, Default)]
pub struct TxPool {
    txs: Vec<Transaction>,
    index: HashMap<TxHash, usize>,
}

impl TxPool {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    #[inline]
    pub fn contains(&self, hash: TxHash) -> bool {
        self.index.contains_key(&hash)
    }

    pub fn get(&self, hash: TxHash) -> Option<&Transaction> {
        self.index.get(&hash).map(|&i| &self.txs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.txs.iter()
    }

    /// Admits `txs` into the pool. Re-admitting a hash already present
    /// replaces the resident transaction.
    pub fn add_txs<I>(&mut self, txs: I)
    where
        I: IntoIterator<Item = Transaction>,
    {
        for tx in txs {
            match self.index.get(&tx.hash()) {
                Some(&i) => self.txs[i] = tx,
                None => {
                    self.index.insert(tx.hash(), self.txs.len());
                    self.txs.push(tx);
                }
            }
        }
    }

    /// Removes the given transactions from the pool. Removing a hash that
    /// is not resident is an integration error and aborts the operation.
    pub fn remove_txs(&mut self, hashes: &[TxHash]) -> Result<(), PoolError> {
        for &hash in hashes {
            let i = self
                .index
                .remove(&hash)
                .ok_or(PoolError::UnknownTransaction(hash))?;

            self.txs.swap_remove(i);
            if i < self.txs.len() {
                self.index.insert(self.txs[i].hash(), i);
            }
        }

        Ok(())
    }

    /// Applies the cancellation transition to the given transactions: gas
    /// usage drops to zero and the premium field is surcharged by
    /// `cancel_cost`. The transactions stay resident in the pool.
    pub fn cancel_txs(
        &mut self,
        hashes: &[TxHash],
        cancel_cost: Wei,
    ) -> Result<(), PoolError> {
        for &hash in hashes {
            let i = *self
                .index
                .get(&hash)
                .ok_or(PoolError::UnknownTransaction(hash))?;

            self.txs[i].cancel(cancel_cost);
        }

        Ok(())
    }

    /// The selection auction, queried once per round: ranks the currently
    /// valid transactions by descending tip and returns the winners that
    /// fit under `max_gas`, in inclusion order.
    ///
    /// The valid set is shuffled before the (stable) sort, so inclusion
    /// order among equal tips is uniformly random rather than biased by
    /// admission order. Winners are taken greedily in rank order until the
    /// next transaction would exceed the ceiling; there is no bin-packing
    /// beyond that. The pool itself is not modified.
    pub fn select<R: Rng + ?Sized>(
        &self,
        env: &Environment,
        max_gas: Gas,
        rng: &mut R,
    ) -> Vec<Transaction> {
        let mut valid: Vec<&Transaction> =
            self.txs.iter().filter(|tx| tx.is_valid(env)).collect();

        valid.shuffle(rng);
        valid.sort_by(|a, b| b.tip(env).cmp(&a.tip(env)));

        let mut winners = Vec::new();
        let mut gas: Gas = 0;
        for tx in valid {
            if gas + tx.gas_used() > max_gas {
                break;
            }

            gas += tx.gas_used();
            winners.push(tx.clone());
        }

        winners
    }

    /// Mean miner tip across the pool at `env`, in Gwei. Zero when the pool
    /// is empty.
    pub fn average_tip(&self, env: &Environment) -> f64 {
        if self.txs.is_empty() {
            return 0.0;
        }

        let total: Wei = self.txs.iter().map(|tx| tx.tip(env)).sum();

        to_gwei(total) / self.txs.len() as f64
    }

    /// Mean effective price across the pool at `env`, in Gwei. Zero when
    /// the pool is empty.
    pub fn average_gas_price(&self, env: &Environment) -> f64 {
        if self.txs.is_empty() {
            return 0.0;
        }

        let total: Wei = self.txs.iter().map(|tx| tx.gas_price(env)).sum();

        to_gwei(total) / self.txs.len() as f64
    }

    /// Mean rounds the resident transactions have been waiting, over the
    /// whole pool population. Zero when the pool is empty.
    pub fn average_waiting_time(&self, env: &Environment) -> f64 {
        if self.txs.is_empty() {
            return 0.0;
        }

        let waited: u64 = self
            .txs
            .iter()
            .map(|tx| env.current_round.saturating_sub(tx.start_round()))
            .sum();

        waited as f64 / self.txs.len() as f64
    }

    /// Mean payoff the resident senders would realize if included at `env`
    /// (current valuation net of delay cost, minus the price paid), in
    /// Gwei. Looks each sender up in the registry; an unknown sender means
    /// the pool and registry have diverged. Zero when the pool is empty.
    pub fn average_welfare(
        &self,
        env: &Environment,
        users: &UserPool,
    ) -> Result<f64, RegistryError> {
        if self.txs.is_empty() {
            return Ok(0.0);
        }

        let mut total: i128 = 0;
        for tx in &self.txs {
            let sender = users.get(tx.sender())?;
            total += sender.current_value(env) - tx.gas_price(env) as i128;
        }

        Ok(total as f64 / self.txs.len() as f64 / crate::config::GWEI as f64)
    }
}
