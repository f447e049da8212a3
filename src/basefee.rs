//! The basefee adjustment rule.
//!
//! A single continuously-updated scalar driven once per round: blocks above
//! the gas target push the basefee up, blocks below pull it down, with the
//! relative step bounded by `1 / basefee_max_change_denominator`. All
//! arithmetic is integer floor-division so the trajectory is exactly
//! reproducible.

use crate::{
    chain::Block,
    config::{Gas, Protocol, Wei},
};

/// Basefee for the next round, given the gas used by the last block.
///
/// An above-target block raises the fee by at least one wei, so integer
/// truncation cannot stall the controller at low fee values. A below-target
/// block lowers the fee with no such floor; the decrement never exceeds the
/// fee itself, so the result bottoms out at zero.
pub fn next_basefee(gas_used: Gas, basefee: Wei, protocol: &Protocol) -> Wei {
    let target = protocol.target_gas_used;
    let denominator = protocol.basefee_max_change_denominator;

    if gas_used == target {
        return basefee;
    }

    if gas_used > target {
        let delta = gas_used - target;
        let step = scaled_step(basefee, delta, target, denominator);

        basefee.saturating_add(step.max(1))
    } else {
        let delta = target - gas_used;
        let step = scaled_step(basefee, delta, target, denominator);

        basefee.saturating_sub(step)
    }
}

/// Basefee for the round after `block`, given the basefee `block` was built
/// under.
pub fn update_basefee(block: &Block, basefee: Wei, protocol: &Protocol) -> Wei {
    next_basefee(block.gas_used(), basefee, protocol)
}

/// Highest basefee reachable after `rounds` further adjustments, assuming
/// every block from here on is completely full. Anticipatory bidders price
/// against this bound.
pub fn worst_case_basefee(basefee: Wei, rounds: u64, denominator: u64) -> Wei {
    let mut fee = basefee;
    for _ in 0..rounds {
        fee = fee.saturating_add((fee / denominator).max(1));
    }

    fee
}

/// `basefee * delta / target / denominator`, floor-divided, widened to avoid
/// overflow in the intermediate product.
fn scaled_step(basefee: Wei, delta: Gas, target: Gas, denominator: u64) -> Wei {
    let step = basefee as u128 * delta as u128
        / target as u128
        / denominator as u128;

    step.min(Wei::MAX as u128) as Wei
}

#[cfg(test)]
mod tests {
    use crate::config::{Protocol, GWEI};

    use super::{next_basefee, worst_case_basefee};

    #[test]
    fn on_target_block_leaves_fee_unchanged() {
        let protocol = Protocol::default();

        for fee in [0, 1, GWEI, 123 * GWEI] {
            assert_eq!(next_basefee(protocol.target_gas_used, fee, &protocol), fee);
        }
    }

    #[test]
    fn full_block_raises_fee_by_an_eighth() {
        let protocol = Protocol::default();

        // gas_used == 2 * target, denominator == 8.
        let next = next_basefee(2 * protocol.target_gas_used, GWEI, &protocol);
        assert_eq!(next, 1_125_000_000);
    }

    #[test]
    fn increase_is_floored_at_one_wei() {
        let protocol = Protocol::default();

        // 7 * delta / target / 8 floor-divides to zero; the floor kicks in.
        let next = next_basefee(2 * protocol.target_gas_used, 7, &protocol);
        assert_eq!(next, 8);
    }

    #[test]
    fn empty_block_lowers_fee_without_underflow() {
        let protocol = Protocol::default();

        let next = next_basefee(0, GWEI, &protocol);
        assert_eq!(next, GWEI - GWEI / 8);

        // The decrement is always strictly smaller than the fee.
        assert_eq!(next_basefee(0, 1, &protocol), 1);
        assert_eq!(next_basefee(0, 0, &protocol), 0);
    }

    #[test]
    fn worst_case_bound_compounds_per_round() {
        assert_eq!(worst_case_basefee(GWEI, 0, 8), GWEI);
        assert_eq!(worst_case_basefee(GWEI, 1, 8), GWEI + GWEI / 8);

        let mut expected = GWEI;
        for _ in 0..5 {
            expected += expected / 8;
        }
        assert_eq!(worst_case_basefee(GWEI, 5, 8), expected);
    }
}
