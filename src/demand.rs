//! Demand generation: Poisson arrivals over a mixture of user strategies.

use std::{fmt, sync::Arc};

use rand::{
    distributions::{Distribution, WeightedError, WeightedIndex},
    RngCore,
};
use rand_distr::Poisson;
use thiserror::Error;

use crate::user::{FixedPrice, Optimistic, Patient, Strategic, User};

#[derive(Debug, Error)]
pub enum DemandError {
    #[error("demand mixture has no entries")]
    EmptyMix,
    #[error("invalid demand mixture weights")]
    BadWeights(#[from] WeightedError),
    #[error("invalid arrival rate {0}")]
    BadArrivalRate(f64),
}

/// Named constructor for one kind of user, so a demand mixture can spawn
/// heterogeneous strategies without knowing their concrete types.
#[derive(Clone)]
pub struct UserFactory {
    name: String,
    spawn: Arc<dyn Fn(u64, &mut dyn RngCore) -> Box<dyn User> + Send + Sync>,
}

impl UserFactory {
    pub fn new<N, F>(name: N, spawn: F) -> Self
    where
        N: Into<String>,
        F: Fn(u64, &mut dyn RngCore) -> Box<dyn User> + Send + Sync + 'static,
    {
        UserFactory { name: name.into(), spawn: Arc::new(spawn) }
    }

    /// Spawns one user waking up at `wakeup_round`.
    pub fn spawn(
        &self,
        wakeup_round: u64,
        rng: &mut dyn RngCore,
    ) -> Box<dyn User> {
        (self.spawn)(wakeup_round, rng)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Factory for [Patient] users with freshly drawn profiles.
    pub fn patient() -> Self {
        Self::new("Patient", |round, rng| Box::new(Patient::new(round, rng)))
    }

    /// Factory for [Optimistic] users with freshly drawn profiles.
    pub fn optimistic() -> Self {
        Self::new("Optimistic", |round, rng| {
            Box::new(Optimistic::new(round, rng))
        })
    }

    /// Factory for [Strategic] users with freshly drawn profiles.
    pub fn strategic() -> Self {
        Self::new("Strategic", |round, rng| {
            Box::new(Strategic::new(round, rng))
        })
    }

    /// Factory for [FixedPrice] users with freshly drawn profiles.
    pub fn fixed_price() -> Self {
        Self::new("Fixed price", |round, rng| {
            Box::new(FixedPrice::new(round, rng))
        })
    }
}

impl fmt::Debug for UserFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<UserFactory: {}>", self.name)
    }
}

/// Weighted mixture of user factories. Each arrival picks its strategy
/// according to the weights.
#[derive(Debug, Clone, Default)]
pub struct DemandMix {
    entries: Vec<(f64, UserFactory)>,
}

impl DemandMix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory with the given relative weight.
    pub fn share(mut self, weight: f64, factory: UserFactory) -> Self {
        self.entries.push((weight, factory));

        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that the mixture is non-empty and its weights form a valid
    /// discrete distribution.
    pub fn validate(&self) -> Result<(), DemandError> {
        self.weighted_index().map(|_| ())
    }

    /// Spawns one round's arrivals: a Poisson(`rate`) draw of new users,
    /// each assigned a strategy by weighted choice. A rate of zero spawns
    /// nobody; a negative or non-finite rate is an error.
    pub fn spawn(
        &self,
        wakeup_round: u64,
        rate: f64,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Box<dyn User>>, DemandError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(DemandError::BadArrivalRate(rate));
        }
        if rate == 0.0 {
            return Ok(Vec::new());
        }

        let poisson =
            Poisson::new(rate).map_err(|_| DemandError::BadArrivalRate(rate))?;
        let arrivals: f64 = poisson.sample(rng);
        let arrivals = arrivals as usize;

        let choice = self.weighted_index()?;
        let users = (0..arrivals)
            .map(|_| {
                let (_, factory) = &self.entries[choice.sample(rng)];
                factory.spawn(wakeup_round, rng)
            })
            .collect();

        Ok(users)
    }

    fn weighted_index(&self) -> Result<WeightedIndex<f64>, DemandError> {
        if self.entries.is_empty() {
            return Err(DemandError::EmptyMix);
        }

        Ok(WeightedIndex::new(self.entries.iter().map(|(w, _)| *w))?)
    }
}

/// Arrival rate per round, either flat or scripted round by round.
#[derive(Debug, Clone)]
pub enum DemandSchedule {
    /// The same expected number of arrivals every round.
    Constant(f64),
    /// One expected arrival count per round; rounds past the end of the
    /// script see zero demand.
    PerRound(Vec<f64>),
}

impl DemandSchedule {
    pub fn rate_at(&self, round: u64) -> f64 {
        match self {
            DemandSchedule::Constant(rate) => *rate,
            DemandSchedule::PerRound(rates) => {
                rates.get(round as usize).copied().unwrap_or(0.0)
            }
        }
    }

    /// Number of rounds this schedule explicitly covers, if scripted.
    pub fn scripted_rounds(&self) -> Option<usize> {
        match self {
            DemandSchedule::Constant(_) => None,
            DemandSchedule::PerRound(rates) => Some(rates.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::{DemandError, DemandMix, DemandSchedule, UserFactory};

    #[test]
    fn zero_rate_spawns_nobody() {
        let mut rng = StdRng::seed_from_u64(31);
        let mix = DemandMix::new().share(1.0, UserFactory::patient());

        assert!(mix.spawn(0, 0.0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn negative_rate_is_rejected() {
        let mut rng = StdRng::seed_from_u64(32);
        let mix = DemandMix::new().share(1.0, UserFactory::patient());

        assert!(matches!(
            mix.spawn(0, -1.0, &mut rng),
            Err(DemandError::BadArrivalRate(_))
        ));
    }

    #[test]
    fn empty_mix_is_rejected() {
        let mut rng = StdRng::seed_from_u64(33);
        let mix = DemandMix::new();

        assert!(matches!(
            mix.spawn(0, 10.0, &mut rng),
            Err(DemandError::EmptyMix)
        ));
        assert!(mix.validate().is_err());
    }

    #[test]
    fn arrivals_carry_their_wakeup_round() {
        let mut rng = StdRng::seed_from_u64(34);
        let mix = DemandMix::new()
            .share(0.5, UserFactory::patient())
            .share(0.5, UserFactory::strategic());

        let users = mix.spawn(42, 50.0, &mut rng).unwrap();
        assert!(!users.is_empty());
        assert!(users.iter().all(|user| user.wakeup_round() == 42));
    }

    #[test]
    fn scripted_schedule_runs_out_to_zero() {
        let schedule = DemandSchedule::PerRound(vec![5.0, 10.0]);

        assert_eq!(schedule.rate_at(0), 5.0);
        assert_eq!(schedule.rate_at(1), 10.0);
        assert_eq!(schedule.rate_at(2), 0.0);
        assert_eq!(schedule.scripted_rounds(), Some(2));
    }
}
