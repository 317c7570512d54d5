//! IOU application and remote balance reconciliation.
//!
//! The free functions are pure over the member collection and return a new
//! list. [`BalanceLedger`] wraps an owned member list for callers that keep
//! state across operations.

use groupsettle_types::{BalanceMap, GroupSettleError, Iou, Member, MemberAddress, Result};
use rust_decimal::Decimal;

/// Apply an IOU: `debtor.net_balance += amount`, `creditor.net_balance -= amount`.
///
/// # Errors
/// Returns [`GroupSettleError::InvalidIou`] (and changes nothing) if the
/// amount is not positive, the debtor and creditor are the same address,
/// either address is not in `members`, or a balance would overflow.
pub fn apply_iou(members: &[Member], iou: &Iou) -> Result<Vec<Member>> {
    validate_iou(members, iou)?;

    let mut updated = Vec::with_capacity(members.len());
    for member in members {
        let mut member = member.clone();
        let shifted = if member.address == iou.debtor {
            member.net_balance.checked_add(iou.amount)
        } else if member.address == iou.creditor {
            member.net_balance.checked_sub(iou.amount)
        } else {
            Some(member.net_balance)
        };
        member.net_balance = shifted.ok_or_else(|| GroupSettleError::InvalidIou {
            reason: "balance overflow".into(),
        })?;
        updated.push(member);
    }

    tracing::debug!(
        debtor = %iou.debtor,
        creditor = %iou.creditor,
        amount = %iou.amount,
        "applied IOU"
    );
    Ok(updated)
}

/// Overwrite local balances with remote ones for every address the snapshot
/// covers. Members absent from `remote` keep their local value; snapshot
/// entries for unknown addresses are ignored. An empty snapshot is a no-op.
#[must_use]
pub fn merge_remote_balances(local: &[Member], remote: &BalanceMap) -> Vec<Member> {
    local
        .iter()
        .map(|m| match remote.get(&m.address) {
            Some(remote_balance) => Member {
                net_balance: *remote_balance,
                ..m.clone()
            },
            None => m.clone(),
        })
        .collect()
}

/// Sum of all members' net balances. Zero for a closed group; `None` if
/// the sum does not fit in a `Decimal`.
#[must_use]
pub fn net_total(members: &[Member]) -> Option<Decimal> {
    members
        .iter()
        .try_fold(Decimal::ZERO, |total, m| total.checked_add(m.net_balance))
}

fn validate_iou(members: &[Member], iou: &Iou) -> Result<()> {
    if iou.amount <= Decimal::ZERO {
        return Err(GroupSettleError::InvalidIou {
            reason: format!("amount must be positive, got {}", iou.amount),
        });
    }
    if iou.debtor == iou.creditor {
        return Err(GroupSettleError::InvalidIou {
            reason: format!("{} cannot owe themselves", iou.debtor),
        });
    }
    for party in [&iou.debtor, &iou.creditor] {
        if !members.iter().any(|m| &m.address == party) {
            return Err(GroupSettleError::InvalidIou {
                reason: format!("{party} is not a member of the group"),
            });
        }
    }
    Ok(())
}

/// Owned member list with the ledger operations applied in place.
///
/// Every mutation is all-or-nothing: on error the list is unchanged.
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    members: Vec<Member>,
}

impl BalanceLedger {
    #[must_use]
    pub fn new(members: Vec<Member>) -> Self {
        Self { members }
    }

    /// Members in roster order.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Current balance of `address`, if it is a member.
    #[must_use]
    pub fn balance_of(&self, address: &MemberAddress) -> Option<Decimal> {
        self.members
            .iter()
            .find(|m| &m.address == address)
            .map(|m| m.net_balance)
    }

    #[must_use]
    pub fn contains(&self, address: &MemberAddress) -> bool {
        self.members.iter().any(|m| &m.address == address)
    }

    pub fn apply(&mut self, iou: &Iou) -> Result<()> {
        self.members = apply_iou(&self.members, iou)?;
        Ok(())
    }

    /// Fold an authoritative snapshot over local state.
    pub fn merge_remote(&mut self, remote: &BalanceMap) {
        if remote.is_empty() {
            return;
        }
        self.members = merge_remote_balances(&self.members, remote);
        tracing::debug!(entries = remote.len(), "merged remote balances");
    }

    /// Replace the roster wholesale, keeping nothing from the old one.
    pub fn replace(&mut self, members: Vec<Member>) {
        self.members = members;
    }

    /// Snapshot of current balances keyed by address.
    #[must_use]
    pub fn snapshot(&self) -> BalanceMap {
        self.members
            .iter()
            .map(|m| (m.address.clone(), m.net_balance))
            .collect()
    }

    #[must_use]
    pub fn net_total(&self) -> Option<Decimal> {
        net_total(&self.members)
    }
}
