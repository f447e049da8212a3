//! Building and running fee-market simulations.

pub mod builder;

pub use builder::{SimulationBuildError, SimulationBuilder};

use rand::{rngs::StdRng, SeedableRng};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    basefee::update_basefee,
    chain::{Block, Chain, ChainError},
    config::{Environment, Protocol, Wei},
    demand::{DemandError, DemandMix, DemandSchedule},
    results::RoundMetrics,
    transaction::Transaction,
    txpool::{PoolError, TxPool},
    userpool::{RegistryError, UserPool},
    utils::to_gwei,
};

/// Container for a group of simulations which share a configuration and
/// differ only by seed. Run them with [SimulationGroup::run_all].
#[derive(Debug, Clone)]
pub struct SimulationGroup {
    pub(crate) sims: Vec<Simulation>,
}

impl SimulationGroup {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    /// Executes every configured simulation, in parallel when the `rayon`
    /// feature is enabled. Outputs are returned in seed order.
    pub fn run_all(self) -> Result<Vec<SimulationOutput>, SimulationError> {
        #[cfg(feature = "rayon")]
        let outputs: Result<Vec<_>, _> =
            self.sims.into_par_iter().map(Simulation::run).collect();

        #[cfg(not(feature = "rayon"))]
        let outputs: Result<Vec<_>, _> =
            self.sims.into_iter().map(Simulation::run).collect();

        outputs
    }
}

/// One seeded run of the fee market over a fixed number of rounds.
///
/// # Details
/// Each round: new users wake up and decide whether to bid, their
/// transactions enter the pool, queue residents get a chance to cancel,
/// the selection auction fills a block, and the basefee adjusts to the
/// block's gas usage. All randomness comes from one `StdRng` seeded with
/// the run's seed, so a run is exactly reproducible.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub(crate) rounds: u64,
    pub(crate) seed: u64,
    pub(crate) protocol: Protocol,
    pub(crate) demand: DemandSchedule,
    pub(crate) mix: DemandMix,
    pub(crate) cancel_cost: Option<Wei>,
}

/// Contains the output data from a simulation.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    /// The chain of blocks produced by the run.
    pub chain: Chain,
    /// Transactions still pending when the run stopped.
    pub pool: TxPool,
    /// Every user that woke up during the run.
    pub users: UserPool,
    /// One metrics row per round.
    pub metrics: Vec<RoundMetrics>,
    pub seed: u64,
    pub rounds: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("demand generation failed")]
    Demand(#[from] DemandError),
    #[error("chain rejected a block")]
    Chain(#[from] ChainError),
    #[error("transaction pool lookup failed")]
    Pool(#[from] PoolError),
    #[error("user registry lookup failed")]
    Registry(#[from] RegistryError),
}

impl Simulation {
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Executes the configured simulation.
    pub fn run(self) -> Result<SimulationOutput, SimulationError> {
        let Simulation { rounds, seed, protocol, demand, mix, cancel_cost } =
            self;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut pool = TxPool::new();
        let mut users = UserPool::new();
        let mut chain = Chain::new();
        let mut basefee = protocol.initial_basefee;
        let mut min_premium: Option<Wei> = None;
        let mut metrics = Vec::with_capacity(rounds as usize);

        for round in 0..rounds {
            let mut env = Environment::new(basefee, round);
            if let Some(premium) = min_premium {
                env = env.with_min_premium(premium);
            }
            if let Some(cost) = cancel_cost {
                env = env.with_cancel_cost(cost);
            }

            // User side: wake up new demand and collect its bids.
            let arrivals = mix.spawn(round, demand.rate_at(round), &mut rng)?;
            let spawned_users = arrivals.len();
            let decided = users.decide_transactions(arrivals, &env, &mut rng);
            let decided_txs = decided.len();
            pool.add_txs(decided);

            // Queue residents may pay to withdraw before the auction runs.
            let cancelled_txs = match cancel_cost {
                Some(cost) => {
                    let hashes = users.cancel_requests(&pool, &env)?;
                    pool.cancel_txs(&hashes, cost)?;
                    hashes.len()
                }
                None => 0,
            };

            // Miner side: auction the block space and commit the winners.
            let winners = pool.select(&env, protocol.max_gas, &mut rng);
            let hashes: Vec<_> =
                winners.iter().map(Transaction::hash).collect();
            pool.remove_txs(&hashes)?;

            let block = Block::new(
                winners,
                chain.head(),
                round,
                basefee,
                protocol.max_gas,
                &mut rng,
            )?;
            min_premium = Some(block.min_premium());

            metrics.push(RoundMetrics {
                round,
                basefee: to_gwei(basefee),
                spawned_users,
                decided_txs,
                included_txs: block.len(),
                cancelled_txs,
                block_avg_tip: block.average_tip(),
                block_avg_gas_price: block.average_gas_price(),
                block_avg_waiting_time: block.average_waiting_time(),
                block_min_premium: to_gwei(block.min_premium()),
                pool_length: pool.len(),
                pool_avg_tip: pool.average_tip(&env),
            });

            basefee = update_basefee(&block, basefee, &protocol);
            chain.append(block)?;
        }

        Ok(SimulationOutput { chain, pool, users, metrics, seed, rounds })
    }
}
