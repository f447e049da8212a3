//! Transaction variants competing for block space.
//!
//! Each variant is a distinct commitment shape a bidder can make to the fee
//! market. The pool and the basefee controller only ever go through the
//! shared [Transaction::is_valid], [Transaction::gas_price] and
//! [Transaction::tip] surface, so variants can be mixed freely in one pool.

use std::fmt;

use rand::RngCore;
use thiserror::Error;

use crate::{
    config::{Environment, Gas, Wei, SIMPLE_TX_GAS},
    user::UserId,
};

/// A unique identifier assigned to each [Transaction]. Drawn at random from
/// the run's seeded generator; 64 bits make collisions negligible at
/// simulation scale.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct TxHash([u8; 8]);

impl TxHash {
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 8];
        rng.fill_bytes(&mut bytes);

        TxHash(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<[u8; 8]> for TxHash {
    fn from(bytes: [u8; 8]) -> Self {
        TxHash(bytes)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("escalation deadline round {deadline} precedes start round {start}")]
    DeadlineBeforeStart { start: u64, deadline: u64 },
}

/// Variant-specific pricing parameters of a [Transaction].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    /// Fixed premium over the basefee, capped by a total fee ceiling.
    Bid1559 { max_fee: Wei, gas_premium: Wei },
    /// Premium escalating linearly from `start_premium` at the start round
    /// to `max_premium` at `max_round`. The miner keeps the whole price.
    Escalator {
        max_round: u64,
        start_premium: Wei,
        max_premium: Wei,
    },
    /// Escalating premium riding on top of the current basefee, capped by a
    /// total fee ceiling.
    FloatingEscalator {
        max_round: u64,
        start_premium: Wei,
        max_premium: Wei,
        max_fee: Wei,
    },
    /// Pre-1559 posted price, independent of the basefee. The miner keeps
    /// the whole price.
    Legacy { gas_price: Wei },
}

impl TxKind {
    /// Name of the pricing rule, for export records.
    pub fn name(&self) -> &'static str {
        match self {
            TxKind::Bid1559 { .. } => "1559",
            TxKind::Escalator { .. } => "escalator",
            TxKind::FloatingEscalator { .. } => "floating_escalator",
            TxKind::Legacy { .. } => "legacy",
        }
    }
}

/// A single economic offer for block space. Immutable after creation, with
/// one exception: [Transaction::cancel] marks the offer as withdrawn by
/// zeroing its gas usage and surcharging its premium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    hash: TxHash,
    sender: UserId,
    start_round: u64,
    gas_used: Gas,
    kind: TxKind,
}

impl Transaction {
    /// Creates a 1559-style bid: pays `min(max_fee, basefee + gas_premium)`
    /// per gas, valid while `max_fee` covers the basefee.
    pub fn bid_1559<R: RngCore + ?Sized>(
        sender: UserId,
        start_round: u64,
        max_fee: Wei,
        gas_premium: Wei,
        rng: &mut R,
    ) -> Self {
        Transaction {
            hash: TxHash::random(rng),
            sender,
            start_round,
            gas_used: SIMPLE_TX_GAS,
            kind: TxKind::Bid1559 { max_fee, gas_premium },
        }
    }

    /// Creates an escalating bid over the round window
    /// `[start_round, max_round]`.
    pub fn escalator<R: RngCore + ?Sized>(
        sender: UserId,
        start_round: u64,
        max_round: u64,
        start_premium: Wei,
        max_premium: Wei,
        rng: &mut R,
    ) -> Result<Self, TransactionError> {
        if max_round < start_round {
            return Err(TransactionError::DeadlineBeforeStart {
                start: start_round,
                deadline: max_round,
            });
        }

        Ok(Transaction {
            hash: TxHash::random(rng),
            sender,
            start_round,
            gas_used: SIMPLE_TX_GAS,
            kind: TxKind::Escalator { max_round, start_premium, max_premium },
        })
    }

    /// Creates a floating-cap escalating bid. The escalation ceiling is
    /// derived from the fee ceiling and the basefee observed at creation:
    /// `max_premium = max_fee - basefee`.
    pub fn floating_escalator<R: RngCore + ?Sized>(
        sender: UserId,
        start_round: u64,
        max_round: u64,
        start_premium: Wei,
        max_fee: Wei,
        basefee: Wei,
        rng: &mut R,
    ) -> Result<Self, TransactionError> {
        if max_round < start_round {
            return Err(TransactionError::DeadlineBeforeStart {
                start: start_round,
                deadline: max_round,
            });
        }

        Ok(Transaction {
            hash: TxHash::random(rng),
            sender,
            start_round,
            gas_used: SIMPLE_TX_GAS,
            kind: TxKind::FloatingEscalator {
                max_round,
                start_premium,
                max_premium: max_fee.saturating_sub(basefee),
                max_fee,
            },
        })
    }

    /// Creates a legacy posted-price bid.
    pub fn legacy<R: RngCore + ?Sized>(
        sender: UserId,
        start_round: u64,
        gas_price: Wei,
        rng: &mut R,
    ) -> Self {
        Transaction {
            hash: TxHash::random(rng),
            sender,
            start_round,
            gas_used: SIMPLE_TX_GAS,
            kind: TxKind::Legacy { gas_price },
        }
    }

    #[inline]
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    #[inline]
    pub fn sender(&self) -> UserId {
        self.sender
    }

    #[inline]
    pub fn start_round(&self) -> u64 {
        self.start_round
    }

    #[inline]
    pub fn gas_used(&self) -> Gas {
        self.gas_used
    }

    #[inline]
    pub fn kind(&self) -> &TxKind {
        &self.kind
    }

    /// The variant's premium field: the fixed premium of a 1559 bid, the
    /// start premium of an escalating bid, and the posted price of a legacy
    /// bid. This is the field [Transaction::cancel] surcharges and the field
    /// block premium statistics aggregate.
    pub fn premium(&self) -> Wei {
        match self.kind {
            TxKind::Bid1559 { gas_premium, .. } => gas_premium,
            TxKind::Escalator { start_premium, .. } => start_premium,
            TxKind::FloatingEscalator { start_premium, .. } => start_premium,
            TxKind::Legacy { gas_price } => gas_price,
        }
    }

    /// Total fee ceiling, for the variants that declare one.
    pub fn max_fee(&self) -> Option<Wei> {
        match self.kind {
            TxKind::Bid1559 { max_fee, .. } => Some(max_fee),
            TxKind::FloatingEscalator { max_fee, .. } => Some(max_fee),
            TxKind::Escalator { .. } | TxKind::Legacy { .. } => None,
        }
    }

    /// Whether this offer can be included under `env`.
    pub fn is_valid(&self, env: &Environment) -> bool {
        match self.kind {
            TxKind::Bid1559 { max_fee, .. } => max_fee >= env.basefee,
            TxKind::Escalator { max_round, .. } => {
                self.start_round <= env.current_round
                    && env.current_round <= max_round
            }
            TxKind::FloatingEscalator { max_round, max_fee, .. } => {
                self.start_round <= env.current_round
                    && env.current_round <= max_round
                    && env.basefee <= max_fee
            }
            TxKind::Legacy { .. } => true,
        }
    }

    /// Price per gas the sender pays under `env`.
    pub fn gas_price(&self, env: &Environment) -> Wei {
        match self.kind {
            TxKind::Bid1559 { max_fee, gas_premium } => {
                max_fee.min(env.basefee.saturating_add(gas_premium))
            }
            TxKind::Escalator { max_round, start_premium, max_premium } => {
                escalated_premium(
                    self.start_round,
                    max_round,
                    start_premium,
                    max_premium,
                    env.current_round,
                )
            }
            TxKind::FloatingEscalator {
                max_round,
                start_premium,
                max_premium,
                max_fee,
            } => {
                let premium = escalated_premium(
                    self.start_round,
                    max_round,
                    start_premium,
                    max_premium,
                    env.current_round,
                );

                max_fee.min(env.basefee.saturating_add(premium))
            }
            TxKind::Legacy { gas_price } => gas_price,
        }
    }

    /// Price per gas the miner collects under `env`. For 1559-style bids
    /// the basefee portion is burned; escalator and legacy bids pay their
    /// whole price to the miner.
    pub fn tip(&self, env: &Environment) -> Wei {
        match self.kind {
            TxKind::Bid1559 { .. } | TxKind::FloatingEscalator { .. } => {
                self.gas_price(env).saturating_sub(env.basefee)
            }
            TxKind::Escalator { .. } | TxKind::Legacy { .. } => {
                self.gas_price(env)
            }
        }
    }

    /// Marks this offer as withdrawn: gas usage drops to zero, so inclusion
    /// yields the miner nothing, and the premium field is surcharged by
    /// `cancel_cost`, the price the sender pays to cancel. The transaction
    /// keeps its hash and stays addressable.
    pub(crate) fn cancel(&mut self, cancel_cost: Wei) {
        self.gas_used = 0;

        match &mut self.kind {
            TxKind::Bid1559 { gas_premium, .. } => {
                *gas_premium = gas_premium.saturating_add(cancel_cost);
            }
            TxKind::Escalator { start_premium, .. } => {
                *start_premium = start_premium.saturating_add(cancel_cost);
            }
            TxKind::FloatingEscalator { start_premium, .. } => {
                *start_premium = start_premium.saturating_add(cancel_cost);
            }
            TxKind::Legacy { gas_price } => {
                *gas_price = gas_price.saturating_add(cancel_cost);
            }
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} transaction {} from {} (start round {})",
            self.kind.name(),
            self.hash,
            self.sender,
            self.start_round
        )
    }
}

/// Linear interpolation of the premium across the escalation window. A
/// zero-length window degenerates to the start premium rather than dividing
/// by zero.
fn escalated_premium(
    start_round: u64,
    max_round: u64,
    start_premium: Wei,
    max_premium: Wei,
    current_round: u64,
) -> Wei {
    if max_round == start_round {
        return start_premium;
    }

    let window = (max_round - start_round) as i128;
    let elapsed = current_round as i128 - start_round as i128;
    let start = start_premium as i128;
    let end = max_premium as i128;

    let premium = start + elapsed * (end - start) / window;
    premium.clamp(0, Wei::MAX as i128) as Wei
}
