//! 1559 bidder that prices for inclusion in the next block.

use rand::{Rng, RngCore};

use crate::{
    config::{Environment, Wei, GWEI},
    transaction::Transaction,
};

use super::{plan_bid, BidProfile, User, UserId};

/// Identical decision rule to [Patient](super::Patient), but projects only
/// one round ahead: a near-immediate inclusion assumption leaves a higher
/// fee ceiling and a tighter basefee forecast.
#[derive(Debug, Clone)]
pub struct Optimistic {
    profile: BidProfile,
    gas_premium: Wei,
}

impl Optimistic {
    /// Rounds this strategy expects to wait before inclusion.
    pub const EXPECTED_DELAY: u64 = 1;

    pub fn new<R: Rng + ?Sized>(wakeup_round: u64, rng: &mut R) -> Self {
        Self::with_profile(BidProfile::draw(wakeup_round, rng))
    }

    pub fn with_profile(profile: BidProfile) -> Self {
        Optimistic { profile, gas_premium: GWEI }
    }

    pub fn with_gas_premium(mut self, gas_premium: Wei) -> Self {
        self.gas_premium = gas_premium;

        self
    }

    #[inline]
    pub fn profile(&self) -> &BidProfile {
        &self.profile
    }
}

impl User for Optimistic {
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

        let delay = Self::EXPECTED_DELAY;
        let horizon =
            (env.current_round + delay).saturating_sub(self.profile.wakeup_round);
        let max_fee = self.profile.cost.value_after(self.profile.value, horizon);

        let plan = plan_bid(&self.profile, max_fee, self.gas_premium, delay, env)?;

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
        "Optimistic".into()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::config::{Environment, GWEI};
    use crate::user::{BidProfile, CostModel, User};

    use super::Optimistic;

    #[test]
    fn fee_ceiling_accounts_for_one_round_of_waiting() {
        let mut rng = StdRng::seed_from_u64(6);
        let profile = BidProfile::draw(0, &mut rng)
            .with_value(15 * GWEI)
            .with_cost(CostModel::Affine { cost_per_round: GWEI });

        let env = Environment::new(GWEI, 0);
        let mut user = Optimistic::with_profile(profile);
        let tx = user.create_transaction(&env, &mut rng).unwrap();

        assert_eq!(tx.max_fee(), Some(14 * GWEI));
    }
}
