//! Protocol constants and the per-round environment record.

/// Numeric type used for fees, premiums and valuations, in wei per gas.
pub type Wei = u64;

/// Numeric type used for gas amounts.
pub type Gas = u64;

/// One Gwei, in wei.
pub const GWEI: Wei = 1_000_000_000;

/// Bounds the relative basefee change per round to `1 / denominator`.
pub const BASEFEE_MAX_CHANGE_DENOMINATOR: u64 = 8;

/// Gas usage the basefee controller steers blocks towards.
pub const TARGET_GAS_USED: Gas = 10_000_000;

/// Hard per-block gas ceiling (twice the target).
pub const MAX_GAS: Gas = 20_000_000;

/// Basefee in force at the first simulated round.
pub const INITIAL_BASEFEE: Wei = GWEI;

/// Gas consumed by a simple transfer.
pub const SIMPLE_TX_GAS: Gas = 21_000;

/// Protocol-level parameters of the fee market. [Protocol::default] matches
/// the EIP-1559 mainnet constants scaled to a 10M gas target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    /// Bounds the relative basefee change per round to `1 / denominator`.
    pub basefee_max_change_denominator: u64,
    /// Gas usage the controller steers blocks towards.
    pub target_gas_used: Gas,
    /// Hard per-block gas ceiling.
    pub max_gas: Gas,
    /// Basefee in force at the first round.
    pub initial_basefee: Wei,
    /// Gas consumed by a simple transfer.
    pub simple_tx_gas: Gas,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol {
            basefee_max_change_denominator: BASEFEE_MAX_CHANGE_DENOMINATOR,
            target_gas_used: TARGET_GAS_USED,
            max_gas: MAX_GAS,
            initial_basefee: INITIAL_BASEFEE,
            simple_tx_gas: SIMPLE_TX_GAS,
        }
    }
}

/// Read-only snapshot of the fee environment for one round. Nearly every
/// core operation (transaction validity and pricing, bidding decisions,
/// the selection auction) is a function of this record.
///
/// The optional fields are strategy-specific: a missing `min_premium` or
/// `cancel_cost` must be tolerated by every consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// Basefee in force at `current_round`, in wei per gas.
    pub basefee: Wei,
    /// Height of the block currently being built.
    pub current_round: u64,
    /// Smallest premium included in the previous block, if one was recorded.
    pub min_premium: Option<Wei>,
    /// Premium surcharge paid to cancel a pending transaction.
    pub cancel_cost: Option<Wei>,
}

impl Environment {
    pub fn new(basefee: Wei, current_round: u64) -> Self {
        Environment {
            basefee,
            current_round,
            min_premium: None,
            cancel_cost: None,
        }
    }

    pub fn with_min_premium(mut self, min_premium: Wei) -> Self {
        self.min_premium = Some(min_premium);

        self
    }

    pub fn with_cancel_cost(mut self, cancel_cost: Wei) -> Self {
        self.cancel_cost = Some(cancel_cost);

        self
    }
}
