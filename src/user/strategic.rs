//! 1559 bidder that reacts to the going rate for premiums.

use rand::{Rng, RngCore};

use crate::{
    config::{Environment, Wei, GWEI},
    transaction::Transaction,
};

use super::{plan_bid, BidProfile, User, UserId};

/// Observes the smallest premium accepted into the previous block and
/// overbids it by a small fixed increment, with the full valuation as the
/// fee ceiling. Expects next-block inclusion. When no previous premium has
/// been observed it falls back to a one-Gwei premium.
#[derive(Debug, Clone)]
pub struct Strategic {
    profile: BidProfile,
    epsilon: Wei,
}

impl Strategic {
    /// Rounds this strategy expects to wait before inclusion.
    pub const EXPECTED_DELAY: u64 = 1;

    /// How much the strategy overbids the observed minimum premium by.
    pub const EPSILON: Wei = GWEI / 10;

    /// Premium used before any block has been observed.
    pub const FALLBACK_PREMIUM: Wei = GWEI;

    pub fn new<R: Rng + ?Sized>(wakeup_round: u64, rng: &mut R) -> Self {
        Self::with_profile(BidProfile::draw(wakeup_round, rng))
    }

    pub fn with_profile(profile: BidProfile) -> Self {
        Strategic { profile, epsilon: Self::EPSILON }
    }

    pub fn with_epsilon(mut self, epsilon: Wei) -> Self {
        self.epsilon = epsilon;

        self
    }

    #[inline]
    pub fn profile(&self) -> &BidProfile {
        &self.profile
    }
}

impl User for Strategic {
    fn id(&self) -> UserId {
        self.profile.id
    }

    fn wakeup_round(&self) -> u64 {
        self.profile.wakeup_round
    }

    fn current_value(&self, env: &Environment) -> i128 {
        self.profile.current_value(env)
    }

    fn create_transaction(
        &mut self,
        env: &Environment,
        rng: &mut dyn RngCore,
    ) -> Option<Transaction> {
        if self.profile.decided {
            return None;
        }
        self.profile.decided = true;

        let min_premium = env.min_premium.unwrap_or(Self::FALLBACK_PREMIUM);
        let gas_premium = min_premium.saturating_add(self.epsilon);
        let max_fee = self.profile.value as i128;

        let plan =
            plan_bid(&self.profile, max_fee, gas_premium, Self::EXPECTED_DELAY, env)?;

        Some(Transaction::bid_1559(
            self.profile.id,
            self.profile.wakeup_round,
            plan.max_fee,
            plan.gas_premium,
            rng,
        ))
    }

    fn wants_to_cancel(&self, _tx: &Transaction, env: &Environment) -> bool {
        self.profile.below_cancel_threshold(env)
    }

    fn name(&self) -> String {
        "Strategic".into()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::config::{Environment, GWEI};
    use crate::user::{BidProfile, CostModel, User};

    use super::Strategic;

    fn profile(rng: &mut StdRng) -> BidProfile {
        BidProfile::draw(0, rng)
            .with_value(15 * GWEI)
            .with_cost(CostModel::Affine { cost_per_round: 0 })
    }

    #[test]
    fn overbids_the_observed_minimum_premium() {
        let mut rng = StdRng::seed_from_u64(8);
        let env = Environment::new(GWEI, 0).with_min_premium(3 * GWEI);

        let mut user = Strategic::with_profile(profile(&mut rng));
        let tx = user.create_transaction(&env, &mut rng).unwrap();

        assert_eq!(tx.premium(), 3 * GWEI + Strategic::EPSILON);
        assert_eq!(tx.max_fee(), Some(15 * GWEI));
    }

    #[test]
    fn falls_back_to_one_gwei_without_an_observation() {
        let mut rng = StdRng::seed_from_u64(9);
        let env = Environment::new(GWEI, 0);

        let mut user = Strategic::with_profile(profile(&mut rng));
        let tx = user.create_transaction(&env, &mut rng).unwrap();

        assert_eq!(tx.premium(), GWEI + Strategic::EPSILON);
    }
}
