//! Helper functions shared across modules.

use crate::config::{Wei, GWEI};

/// Converts an amount in wei to a fractional Gwei value for reporting.
pub(crate) fn to_gwei(wei: Wei) -> f64 {
    wei as f64 / GWEI as f64
}
