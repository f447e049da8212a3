//! 1559 bidder that prices for inclusion within five rounds.

use rand::{Rng, RngCore};

use crate::{
    config::{Environment, Wei, GWEI},
    transaction::Transaction,
};

use super::{plan_bid, BidProfile, User, UserId};

/// Posts a fixed one-Gwei premium and caps its fee at the value it expects
/// to have left after a five-round wait, balking when the worst-case
/// basefee projection leaves no payoff at that horizon.
#[derive(Debug, Clone)]
pub struct Patient {
    profile: BidProfile,
    gas_premium: Wei,
}

impl Patient {
    /// Rounds this strategy expects to wait before inclusion.
    pub const EXPECTED_DELAY: u64 = 5;

    pub fn new<R: Rng + ?Sized>(wakeup_round: u64, rng: &mut R) -> Self {
        Self::with_profile(BidProfile::draw(wakeup_round, rng))
    }

    pub fn with_profile(profile: BidProfile) -> Self {
        Patient { profile, gas_premium: GWEI }
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

impl User for Patient {
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
        "Patient".into()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::config::{Environment, GWEI};
    use crate::user::{BidProfile, CostModel, User};

    use super::Patient;

    fn fixed_profile(value: u64, cost_per_round: u64) -> BidProfile {
        BidProfile::draw(0, &mut StdRng::seed_from_u64(1))
            .with_value(value)
            .with_cost(CostModel::Affine { cost_per_round })
    }

    #[test]
    fn zero_valuation_never_bids() {
        let mut rng = StdRng::seed_from_u64(2);
        let env = Environment::new(GWEI, 0);

        for cost_per_round in [0, GWEI / 2, GWEI] {
            let mut user =
                Patient::with_profile(fixed_profile(0, cost_per_round));
            assert!(user.create_transaction(&env, &mut rng).is_none());
        }
    }

    #[test]
    fn fee_ceiling_accounts_for_five_rounds_of_waiting() {
        let mut rng = StdRng::seed_from_u64(3);
        let env = Environment::new(GWEI, 0);

        let mut user = Patient::with_profile(fixed_profile(15 * GWEI, GWEI));
        let tx = user.create_transaction(&env, &mut rng).unwrap();

        assert_eq!(tx.max_fee(), Some(10 * GWEI));
        assert_eq!(tx.premium(), GWEI);
        assert_eq!(tx.start_round(), 0);
    }

    #[test]
    fn second_query_returns_none() {
        let mut rng = StdRng::seed_from_u64(4);
        let env = Environment::new(GWEI, 0);

        let mut user = Patient::with_profile(fixed_profile(15 * GWEI, 0));
        assert!(user.create_transaction(&env, &mut rng).is_some());
        assert!(user.create_transaction(&env, &mut rng).is_none());
    }

    #[test]
    fn cancels_once_waiting_erodes_value_below_the_cancel_cost() {
        let mut rng = StdRng::seed_from_u64(5);
        let user = Patient::with_profile(fixed_profile(10 * GWEI, GWEI));
        let tx = crate::transaction::Transaction::bid_1559(
            user.id(),
            0,
            10 * GWEI,
            GWEI,
            &mut rng,
        );

        // Value is still 2 Gwei at round 8; cancel cost not yet reached.
        let env = Environment::new(GWEI, 8).with_cancel_cost(2 * GWEI);
        assert!(!user.wants_to_cancel(&tx, &env));

        // By round 9 only 1 Gwei remains.
        let env = Environment::new(GWEI, 9).with_cancel_cost(2 * GWEI);
        assert!(user.wants_to_cancel(&tx, &env));

        // Without a configured cancel cost nobody cancels.
        let env = Environment::new(GWEI, 9);
        assert!(!user.wants_to_cancel(&tx, &env));
    }
}
