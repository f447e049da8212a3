//! Definitions for representations of fee-market participants.

pub mod fixed_price;
pub mod optimistic;
pub mod patient;
pub mod strategic;

pub use fixed_price::FixedPrice;
pub use optimistic::Optimistic;
pub use patient::Patient;
pub use strategic::Strategic;

use std::fmt::{self, Debug};

use dyn_clone::DynClone;
use rand::{Rng, RngCore};

use crate::{
    basefee::worst_case_basefee,
    config::{Environment, Wei, BASEFEE_MAX_CHANGE_DENOMINATOR, GWEI},
    transaction::Transaction,
};

/// A unique identifier assigned to each [User], drawn at random from the
/// run's seeded generator. Doubles as the sender field on transactions.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct UserId([u8; 8]);

impl UserId {
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 8];
        rng.fill_bytes(&mut bytes);

        UserId(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<[u8; 8]> for UserId {
    fn from(bytes: [u8; 8]) -> Self {
        UserId(bytes)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

/// How delay erodes a user's willingness to pay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostModel {
    /// A fixed cost per round of waiting.
    Affine { cost_per_round: Wei },
    /// The valuation decays geometrically per round of waiting.
    Discount { rate: f64 },
}

impl CostModel {
    /// Value remaining from `value` after `elapsed` rounds of waiting. Can
    /// go negative under the affine model.
    pub fn value_after(&self, value: Wei, elapsed: u64) -> i128 {
        match self {
            CostModel::Affine { cost_per_round } => {
                value as i128 - *cost_per_round as i128 * elapsed as i128
            }
            CostModel::Discount { rate } => {
                (value as f64 * (1.0 - rate).powi(elapsed as i32)) as i128
            }
        }
    }
}

/// Whether an expected payoff is good enough to bid on.
///
/// The reference behavior of strategic bidders is ambiguous on whether a
/// zero expected payoff is worth transacting, so the threshold is a
/// configuration choice. The default requires a strictly positive payoff,
/// under which a zero-valuation user never bids.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PayoffGate {
    /// Bid only when the expected payoff is strictly positive.
    #[default]
    Positive,
    /// Bid whenever the expected payoff is non-negative.
    NonNegative,
}

impl PayoffGate {
    #[inline]
    pub fn accepts(&self, payoff: i128) -> bool {
        match self {
            PayoffGate::Positive => payoff > 0,
            PayoffGate::NonNegative => payoff >= 0,
        }
    }
}

/// Economic identity shared by every bidding strategy: a privately drawn
/// valuation, a cost-accrual model, and the payoff gate. Fixed at creation;
/// the only mutable piece is the one-shot decision latch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BidProfile {
    pub id: UserId,
    pub wakeup_round: u64,
    /// Willingness-to-pay ceiling, in wei per gas.
    pub value: Wei,
    pub cost: CostModel,
    pub gate: PayoffGate,
    /// Set once the user has been queried for a transaction.
    pub(crate) decided: bool,
}

impl BidProfile {
    /// Valuations are drawn uniformly from [0, 20) Gwei and affine waiting
    /// costs uniformly from [0, 1) Gwei per round.
    pub fn draw<R: Rng + ?Sized>(wakeup_round: u64, rng: &mut R) -> Self {
        let value = (rng.gen_range(0.0..20.0) * GWEI as f64) as Wei;
        let cost_per_round = (rng.gen_range(0.0..1.0) * GWEI as f64) as Wei;

        BidProfile {
            id: UserId::random(rng),
            wakeup_round,
            value,
            cost: CostModel::Affine { cost_per_round },
            gate: PayoffGate::default(),
            decided: false,
        }
    }

    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;

        self
    }

    pub fn with_cost(mut self, cost: CostModel) -> Self {
        self.cost = cost;

        self
    }

    pub fn with_gate(mut self, gate: PayoffGate) -> Self {
        self.gate = gate;

        self
    }

    /// Valuation net of the cost accrued between wakeup and `env`'s round.
    pub fn current_value(&self, env: &Environment) -> i128 {
        let elapsed = env.current_round.saturating_sub(self.wakeup_round);

        self.cost.value_after(self.value, elapsed)
    }

    /// Whether waiting has eroded this user's value below the price of
    /// cancelling. No cancel cost in the environment means no cancellation.
    pub(crate) fn below_cancel_threshold(&self, env: &Environment) -> bool {
        match env.cancel_cost {
            Some(cost) => self.current_value(env) < cost as i128,
            None => false,
        }
    }
}

/// Parameters of a 1559 bid a strategy intends to post.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BidPlan {
    pub max_fee: Wei,
    pub gas_premium: Wei,
}

/// The anticipatory decision rule shared by the 1559 strategies: project
/// the worst-case basefee at the expected inclusion round, price the bid
/// there, and balk unless the payoff at that round passes the profile's
/// gate. A negative fee ceiling always balks.
pub(crate) fn plan_bid(
    profile: &BidProfile,
    max_fee: i128,
    gas_premium: Wei,
    expected_delay: u64,
    env: &Environment,
) -> Option<BidPlan> {
    if max_fee < 0 {
        return None;
    }
    let max_fee = max_fee.min(Wei::MAX as i128) as Wei;

    let projected_basefee = worst_case_basefee(
        env.basefee,
        expected_delay,
        BASEFEE_MAX_CHANGE_DENOMINATOR,
    );
    let expected_price =
        max_fee.min(projected_basefee.saturating_add(gas_premium));

    let inclusion_round = env.current_round + expected_delay;
    let elapsed = inclusion_round.saturating_sub(profile.wakeup_round);
    let expected_value = profile.cost.value_after(profile.value, elapsed);

    let payoff = expected_value - expected_price as i128;
    profile
        .gate
        .accepts(payoff)
        .then_some(BidPlan { max_fee, gas_premium })
}

/// A fee-market participant with some specific bidding strategy.
///
/// A user is queried at most once for a transaction; afterwards it stays in
/// the registry so pool statistics can resolve senders back to valuations.
pub trait User: Debug + DynClone + Send + Sync {
    /// Get this user's [UserId].
    fn id(&self) -> UserId;

    /// The round this user arrived in.
    fn wakeup_round(&self) -> u64;

    /// Valuation net of accrued waiting cost at `env`'s round.
    fn current_value(&self, env: &Environment) -> i128;

    /// Bid or balk. A user emits at most one transaction: every call after
    /// the first returns `None`, whatever the first decision was.
    fn create_transaction(
        &mut self,
        env: &Environment,
        rng: &mut dyn RngCore,
    ) -> Option<Transaction>;

    /// Whether this user's pending transaction `tx` should be cancelled at
    /// `env`. Consulted once per round for queue residents.
    fn wants_to_cancel(&self, _tx: &Transaction, _env: &Environment) -> bool {
        false
    }

    /// Returns the name of the user's strategy.
    fn name(&self) -> String {
        "Name not set".into()
    }
}

dyn_clone::clone_trait_object!(User);
