//! Zero-sum invariant checker.
//!
//! Invariant held by every closed group:
//! ```text
//! Σ(member.net_balance) == expected_total   (0 with no external cash movement)
//! ```
//!
//! IOUs move value between two members and never change the total. A
//! violation means the balance snapshot is corrupt, and any settlement
//! plan computed from it will leave residuals unsettled.

use groupsettle_types::{GroupSettleError, Member, Result, constants::NETTING_EPSILON};
use rust_decimal::Decimal;

use crate::ledger::net_total;

/// Validates that a group's balances still sum to the expected total.
#[derive(Debug, Clone)]
pub struct ZeroSumCheck {
    expected_total: Decimal,
    tolerance: Decimal,
}

impl ZeroSumCheck {
    /// Check against a zero total with the default netting epsilon.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expected_total: Decimal::ZERO,
            tolerance: NETTING_EPSILON,
        }
    }

    /// Check against an explicit total (a group seeded with external cash).
    #[must_use]
    pub fn with_expected_total(expected_total: Decimal) -> Self {
        Self {
            expected_total,
            tolerance: NETTING_EPSILON,
        }
    }

    #[must_use]
    pub fn tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn expected_total(&self) -> Decimal {
        self.expected_total
    }

    /// Verify the members' balances.
    ///
    /// # Errors
    /// Returns [`GroupSettleError::ConservationViolation`] if the actual
    /// total differs from the expected total by more than the tolerance, or
    /// cannot be represented at all.
    pub fn verify(&self, members: &[Member]) -> Result<()> {
        // An unrepresentable total is reported at the saturated bound.
        let actual = net_total(members).unwrap_or_else(|| {
            members
                .iter()
                .fold(Decimal::ZERO, |total, m| total.saturating_add(m.net_balance))
        });
        let off_by = actual
            .checked_sub(self.expected_total)
            .map_or(Decimal::MAX, |d| d.abs());
        if off_by > self.tolerance {
            return Err(GroupSettleError::ConservationViolation {
                expected: self.expected_total,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for ZeroSumCheck {
    fn default() -> Self {
        Self::new()
    }
}
