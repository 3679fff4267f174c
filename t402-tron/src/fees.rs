//! Fee limits and estimates, in SUN (1 TRX = 1 000 000 SUN).

/// SUN per TRX.
pub const SUN_PER_TRX: u64 = 1_000_000;

/// Fee limit used when none is configured (100 TRX).
pub const DEFAULT_FEE_LIMIT: u64 = 100 * SUN_PER_TRX;

/// Lowest accepted fee limit (10 TRX).
pub const MIN_FEE_LIMIT: u64 = 10 * SUN_PER_TRX;

/// Highest accepted fee limit (1000 TRX).
pub const MAX_FEE_LIMIT: u64 = 1000 * SUN_PER_TRX;

/// Energy cost of a typical TRC-20 transfer.
const TRANSFER_FEE: u64 = 30 * SUN_PER_TRX;

/// Extra cost when the recipient account must be activated.
const ACTIVATION_FEE: u64 = SUN_PER_TRX;

/// Rough cost of a TRC-20 transfer.
#[must_use]
pub const fn estimate_transaction_fee(is_activated: bool) -> u64 {
    if is_activated {
        TRANSFER_FEE
    } else {
        TRANSFER_FEE + ACTIVATION_FEE
    }
}

/// Clamps a configured fee limit into `[MIN_FEE_LIMIT, MAX_FEE_LIMIT]`;
/// `None` gives [`DEFAULT_FEE_LIMIT`].
#[must_use]
pub fn fee_limit(configured: Option<u64>) -> u64 {
    configured.map_or(DEFAULT_FEE_LIMIT, |limit| {
        limit.clamp(MIN_FEE_LIMIT, MAX_FEE_LIMIT)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits() {
        assert_eq!(fee_limit(None), 100_000_000);
        assert_eq!(fee_limit(Some(1)), 10_000_000);
        assert_eq!(fee_limit(Some(5_000_000_000)), 1_000_000_000);
        assert_eq!(fee_limit(Some(50_000_000)), 50_000_000);
    }

    #[test]
    fn activation_costs_extra() {
        assert_eq!(estimate_transaction_fee(true), 30_000_000);
        assert_eq!(estimate_transaction_fee(false), 31_000_000);
    }
}
