//! Greedy two-pointer debt netting.
//!
//! ```text
//! compute_settlement(members, order) -> Vec<SettlementPayment>
//! ```
//!
//! ## Algorithm
//!
//! 1. Partition members into debtors (`net_balance > 0`) and creditors
//!    (`net_balance < 0`), tracking each one's outstanding magnitude. The
//!    partition is strict, not epsilon-based: a dust balance still enters
//!    it and can produce a payment leg smaller than epsilon
//! 2. Order both lists per [`NettingOrder`]
//! 3. While both pointers are in range, pay `min(debtor, creditor)` from the
//!    current debtor to the current creditor and subtract it from both
//! 4. Advance whichever pointer's remainder fell to epsilon or below (both
//!    may advance in the same step)
//! 5. Stop when either list runs out; residuals from a non-zero-sum input
//!    are dropped
//!
//! Every step retires at least one party, which bounds the plan at
//! `debtors + creditors - 1` payments.

use std::cmp::Ordering;

use groupsettle_types::{
    Member, MemberAddress, NettingOrder, SettlementPayment, constants::NETTING_EPSILON,
};
use rust_decimal::Decimal;

/// A party with an outstanding magnitude still to be matched.
struct Outstanding {
    address: MemberAddress,
    remaining: Decimal,
}

/// Compute the settlement plan using the default epsilon (0.0001).
#[must_use]
pub fn compute_settlement(members: &[Member], order: NettingOrder) -> Vec<SettlementPayment> {
    compute_settlement_with_epsilon(members, order, NETTING_EPSILON)
}

/// Compute the settlement plan, treating remainders `<= epsilon` as settled.
///
/// Epsilon only governs when a party is retired after a payment; any
/// non-zero starting balance is matched, however small.
///
/// Returns an empty plan if no member has a non-zero balance.
#[must_use]
pub fn compute_settlement_with_epsilon(
    members: &[Member],
    order: NettingOrder,
    epsilon: Decimal,
) -> Vec<SettlementPayment> {
    let (mut debtors, mut creditors): (Vec<Outstanding>, Vec<Outstanding>) = (
        members
            .iter()
            .filter(|m| m.net_balance > Decimal::ZERO)
            .map(|m| Outstanding {
                address: m.address.clone(),
                remaining: m.net_balance,
            })
            .collect(),
        members
            .iter()
            .filter(|m| m.net_balance < Decimal::ZERO)
            .map(|m| Outstanding {
                address: m.address.clone(),
                remaining: -m.net_balance,
            })
            .collect(),
    );

    sort_parties(&mut debtors, order);
    sort_parties(&mut creditors, order);

    let mut payments = Vec::with_capacity((debtors.len() + creditors.len()).saturating_sub(1));
    let (mut d, mut c) = (0, 0);

    while d < debtors.len() && c < creditors.len() {
        let amount = debtors[d].remaining.min(creditors[c].remaining);
        payments.push(SettlementPayment {
            from: debtors[d].address.clone(),
            to: creditors[c].address.clone(),
            amount,
        });

        debtors[d].remaining -= amount;
        creditors[c].remaining -= amount;

        if debtors[d].remaining <= epsilon {
            d += 1;
        }
        if creditors[c].remaining <= epsilon {
            c += 1;
        }
    }

    let residual = debtors[d..]
        .iter()
        .chain(&creditors[c..])
        .map(|p| p.remaining)
        .filter(|r| *r > epsilon)
        .fold(Decimal::ZERO, Decimal::saturating_add);
    if !residual.is_zero() {
        tracing::warn!(
            residual = %residual,
            "balances are not zero-sum; unmatched residual dropped from plan"
        );
    }

    payments
}

fn sort_parties(parties: &mut [Outstanding], order: NettingOrder) {
    match order {
        NettingOrder::InputOrder => {}
        NettingOrder::ByAddress => parties.sort_by(|a, b| a.address.cmp(&b.address)),
        NettingOrder::LargestFirst => parties.sort_by(|a, b| {
            match b.remaining.cmp(&a.remaining) {
                Ordering::Equal => a.address.cmp(&b.address),
                other => other,
            }
        }),
    }
}
