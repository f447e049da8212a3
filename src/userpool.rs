//! Registry of every user that has woken up during a run.

use std::collections::HashMap;

use rand::RngCore;
use thiserror::Error;

use crate::{
    config::Environment,
    transaction::{Transaction, TxHash},
    txpool::TxPool,
    user::{User, UserId},
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no user {0} in the registry")]
    UnknownUser(UserId),
}

/// Arena of boxed users, indexed by [UserId]. Users are retained for the
/// whole run so pool statistics can resolve a transaction's sender back to
/// a valuation, and so cancellation decisions can be re-queried each round.
#[derive(Debug, Clone, Default)]
pub struct UserPool {
    users: Vec<Box<dyn User>>,
    index: HashMap<UserId, usize>,
}

impl UserPool {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn User> {
        self.users.iter().map(|user| user.as_ref())
    }

    /// Adds `user` to the registry. Re-registering an ID replaces the
    /// resident user.
    pub fn register(&mut self, user: Box<dyn User>) {
        match self.index.get(&user.id()) {
            Some(&i) => self.users[i] = user,
            None => {
                self.index.insert(user.id(), self.users.len());
                self.users.push(user);
            }
        }
    }

    /// Looks a user up by sender ID.
    pub fn get(&self, id: UserId) -> Result<&dyn User, RegistryError> {
        self.index
            .get(&id)
            .map(|&i| self.users[i].as_ref())
            .ok_or(RegistryError::UnknownUser(id))
    }

    /// Registers a batch of newly woken users and queries each one for a
    /// transaction. Users that balk stay registered; they just contribute
    /// nothing to the returned list.
    pub fn decide_transactions(
        &mut self,
        users: Vec<Box<dyn User>>,
        env: &Environment,
        rng: &mut dyn RngCore,
    ) -> Vec<Transaction> {
        let mut txs = Vec::new();

        for mut user in users {
            if let Some(tx) = user.create_transaction(env, rng) {
                txs.push(tx);
            }
            self.register(user);
        }

        txs
    }

    /// Asks each pool-resident transaction's sender whether it wants to
    /// cancel at `env`, returning the hashes to cancel. Fails if a resident
    /// transaction's sender is missing from the registry, which means pool
    /// and registry have diverged.
    pub fn cancel_requests(
        &self,
        pool: &TxPool,
        env: &Environment,
    ) -> Result<Vec<TxHash>, RegistryError> {
        let mut cancelled = Vec::new();

        for tx in pool.iter() {
            // Zero gas marks an already-withdrawn bid.
            if tx.gas_used() == 0 {
                continue;
            }

            let user = self.get(tx.sender())?;
            if user.wants_to_cancel(tx, env) {
                cancelled.push(tx.hash());
            }
        }

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::config::{Environment, GWEI};
    use crate::transaction::Transaction;
    use crate::txpool::TxPool;
    use crate::user::{BidProfile, CostModel, Patient, User, UserId};

    use super::{RegistryError, UserPool};

    fn patient(value: u64, cost_per_round: u64, rng: &mut StdRng) -> Patient {
        Patient::with_profile(
            BidProfile::draw(0, rng)
                .with_value(value)
                .with_cost(CostModel::Affine { cost_per_round }),
        )
    }

    #[test]
    fn decide_registers_bidders_and_balkers_alike() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut users = UserPool::new();
        let env = Environment::new(GWEI, 0);

        let bidder = patient(15 * GWEI, 0, &mut rng);
        let balker = patient(0, GWEI, &mut rng);
        let ids = [bidder.id(), balker.id()];

        let txs = users.decide_transactions(
            vec![Box::new(bidder), Box::new(balker)],
            &env,
            &mut rng,
        );

        assert_eq!(txs.len(), 1);
        assert_eq!(users.len(), 2);
        for id in ids {
            assert!(users.get(id).is_ok());
        }
    }

    #[test]
    fn unknown_sender_is_a_lookup_error() {
        let users = UserPool::new();
        let id = UserId::from([5; 8]);

        assert!(matches!(
            users.get(id),
            Err(RegistryError::UnknownUser(_))
        ));
    }

    #[test]
    fn cancel_sweep_collects_only_willing_senders() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut users = UserPool::new();
        let mut pool = TxPool::new();

        // Erodes to nothing quickly; will want to cancel.
        let eager = patient(2 * GWEI, GWEI, &mut rng);
        // No waiting cost; never cancels.
        let steady = patient(10 * GWEI, 0, &mut rng);

        let eager_tx = Transaction::bid_1559(
            eager.id(),
            0,
            2 * GWEI,
            GWEI,
            &mut rng,
        );
        let steady_tx = Transaction::bid_1559(
            steady.id(),
            0,
            10 * GWEI,
            GWEI,
            &mut rng,
        );
        let eager_hash = eager_tx.hash();

        users.register(Box::new(eager));
        users.register(Box::new(steady));
        pool.add_txs([eager_tx, steady_tx]);

        let env = Environment::new(GWEI, 5).with_cancel_cost(GWEI);
        let cancelled = users.cancel_requests(&pool, &env).unwrap();

        assert_eq!(cancelled, vec![eager_hash]);
    }

    #[test]
    fn cancel_sweep_fails_on_a_foreign_transaction() {
        let mut rng = StdRng::seed_from_u64(23);
        let users = UserPool::new();
        let mut pool = TxPool::new();

        let orphan = Transaction::bid_1559(
            UserId::random(&mut rng),
            0,
            GWEI,
            GWEI,
            &mut rng,
        );
        pool.add_txs([orphan]);

        let env = Environment::new(GWEI, 0).with_cancel_cost(GWEI);
        assert!(users.cancel_requests(&pool, &env).is_err());
    }
}
