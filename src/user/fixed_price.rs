//! Legacy posted-price bidder.

use rand::{Rng, RngCore};

use crate::{
    config::{Environment, Wei, GWEI},
    transaction::Transaction,
};

use super::{BidProfile, User, UserId};

/// Posts a legacy transaction at a price fixed when the bid is made: the
/// current basefee plus a one-Gwei margin, capped at the user's valuation.
/// No escalation and no basefee forecasting; the bid goes out whenever the
/// payoff at the current round passes the gate. Never cancels.
#[derive(Debug, Clone)]
pub struct FixedPrice {
    profile: BidProfile,
    margin: Wei,
}

impl FixedPrice {
    /// Margin posted over the basefee observed at decision time.
    pub const DEFAULT_MARGIN: Wei = GWEI;

    pub fn new<R: Rng + ?Sized>(wakeup_round: u64, rng: &mut R) -> Self {
        Self::with_profile(BidProfile::draw(wakeup_round, rng))
    }

    pub fn with_profile(profile: BidProfile) -> Self {
        FixedPrice { profile, margin: Self::DEFAULT_MARGIN }
    }

    pub fn with_margin(mut self, margin: Wei) -> Self {
        self.margin = margin;

        self
    }

    #[inline]
    pub fn profile(&self) -> &BidProfile {
        &self.profile
    }
}

impl User for FixedPrice {
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

        let gas_price =
            env.basefee.saturating_add(self.margin).min(self.profile.value);

        let payoff = self.profile.current_value(env) - gas_price as i128;
        if !self.profile.gate.accepts(payoff) {
            return None;
        }

        Some(Transaction::legacy(
            self.profile.id,
            self.profile.wakeup_round,
            gas_price,
            rng,
        ))
    }

    fn name(&self) -> String {
        "Fixed price".into()
    }
}
