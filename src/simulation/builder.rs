use thiserror::Error;

use crate::{
    config::{Protocol, Wei},
    demand::{DemandError, DemandMix, DemandSchedule, UserFactory},
};

use super::{Simulation, SimulationGroup};

/// Builds a [SimulationGroup].
#[derive(Debug, Default)]
pub struct SimulationBuilder {
    rounds: Option<u64>,
    seeds: Vec<u64>,
    protocol: Option<Protocol>,
    demand: Option<DemandSchedule>,
    mix: DemandMix,
    cancel_cost: Option<Wei>,
}

#[derive(Debug, Error)]
pub enum SimulationBuildError {
    #[error("no user factories were added to the demand mixture")]
    EmptyMix,
    #[error("no demand schedule was given")]
    NoDemandGiven,
    #[error("number of simulation rounds must be greater than 0")]
    ZeroRounds,
    #[error("demand schedule covers {scripted} rounds but the simulation runs {rounds}")]
    ShortSchedule { scripted: usize, rounds: u64 },
    #[error(transparent)]
    Demand(#[from] DemandError),
}

impl SimulationBuilder {
    /// Creates a new [SimulationBuilder].
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user factory to the demand mixture with the given relative
    /// weight.
    pub fn share(mut self, weight: f64, factory: UserFactory) -> Self {
        self.mix = self.mix.share(weight, factory);

        self
    }

    /// Sets the number of rounds the simulation will last for (default 1).
    pub fn with_rounds(mut self, rounds: u64) -> Self {
        self.rounds = Some(rounds);

        self
    }

    /// Expects `rate` new users per round, every round.
    pub fn constant_demand(mut self, rate: f64) -> Self {
        self.demand = Some(DemandSchedule::Constant(rate));

        self
    }

    /// Scripts the expected number of new users round by round.
    pub fn demand_schedule<I>(mut self, rates: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        self.demand =
            Some(DemandSchedule::PerRound(rates.into_iter().collect()));

        self
    }

    /// Overrides the default [Protocol] parameters.
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);

        self
    }

    /// Lets queue residents pay `cancel_cost` to withdraw stale bids.
    /// Without this, nobody cancels.
    pub fn with_cancel_cost(mut self, cancel_cost: Wei) -> Self {
        self.cancel_cost = Some(cancel_cost);

        self
    }

    /// Adds a seeded run to the group (seed 0 is used if none are given).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seeds.push(seed);

        self
    }

    /// Adds one seeded run per element of `seeds`.
    pub fn seeds<I>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        self.seeds.extend(seeds);

        self
    }

    /// Creates a [SimulationGroup] from the specified parameters.
    pub fn build(self) -> Result<SimulationGroup, SimulationBuildError> {
        use SimulationBuildError::*;

        let SimulationBuilder {
            rounds,
            mut seeds,
            protocol,
            demand,
            mix,
            cancel_cost,
        } = self;

        if mix.is_empty() {
            return Err(EmptyMix);
        }
        mix.validate()?;

        let rounds = match rounds {
            Some(0) => return Err(ZeroRounds),
            Some(x) => x,
            None => 1,
        };

        let demand = demand.ok_or(NoDemandGiven)?;
        if let Some(scripted) = demand.scripted_rounds() {
            if (scripted as u64) < rounds {
                return Err(ShortSchedule { scripted, rounds });
            }
        }

        if seeds.is_empty() {
            seeds.push(0);
        }
        let protocol = protocol.unwrap_or_default();

        let sims = seeds
            .into_iter()
            .map(|seed| Simulation {
                rounds,
                seed,
                protocol: protocol.clone(),
                demand: demand.clone(),
                mix: mix.clone(),
                cancel_cost,
            })
            .collect();

        Ok(SimulationGroup { sims })
    }
}
