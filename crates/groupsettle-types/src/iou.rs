//! Balance mutation and settlement leg types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::MemberAddress;

/// A single bilateral debt instruction: `debtor` owes `creditor` `amount`.
///
/// Ephemeral: an IOU is a mutation request, not a stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iou {
    pub debtor: MemberAddress,
    pub creditor: MemberAddress,
    pub amount: Decimal,
}

impl Iou {
    #[must_use]
    pub fn new(
        debtor: impl Into<MemberAddress>,
        creditor: impl Into<MemberAddress>,
        amount: Decimal,
    ) -> Self {
        Self {
            debtor: debtor.into(),
            creditor: creditor.into(),
            amount,
        }
    }
}

/// One leg of a settlement plan: `from` pays `to` `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementPayment {
    pub from: MemberAddress,
    pub to: MemberAddress,
    pub amount: Decimal,
}

impl SettlementPayment {
    #[must_use]
    pub fn new(
        from: impl Into<MemberAddress>,
        to: impl Into<MemberAddress>,
        amount: Decimal,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

impl std::fmt::Display for SettlementPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.amount)
    }
}
