//! Group and member records.
//!
//! A member's `net_balance` is signed: positive means the member owes the
//! group, negative means the group owes the member. Within a closed group
//! the balances sum to zero.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{GroupId, MemberAddress};

/// Authoritative balance snapshot keyed by member address.
///
/// May be partial or empty; absent addresses carry no information.
pub type BalanceMap = BTreeMap<MemberAddress, Decimal>;

/// Presentation-only activity flag. Never consulted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Idle,
    #[default]
    Unknown,
}

/// One participant of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Stable identifier within the group. Never changes.
    pub address: MemberAddress,
    /// Optional human-readable label.
    pub display_name: Option<String>,
    /// Signed net position (positive = owes, negative = is owed).
    pub net_balance: Decimal,
    pub status: MemberStatus,
    /// Informational timestamp string, passed through untouched.
    pub last_active: Option<String>,
}

impl Member {
    /// A member with a zero balance and no presentation data.
    #[must_use]
    pub fn new(address: impl Into<MemberAddress>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
            net_balance: Decimal::ZERO,
            status: MemberStatus::Unknown,
            last_active: None,
        }
    }

    #[must_use]
    pub fn with_balance(mut self, net_balance: Decimal) -> Self {
        self.net_balance = net_balance;
        self
    }

    /// Whether this member owes the group.
    #[must_use]
    pub fn is_debtor(&self) -> bool {
        self.net_balance > Decimal::ZERO
    }

    /// Whether the group owes this member.
    #[must_use]
    pub fn is_creditor(&self) -> bool {
        self.net_balance < Decimal::ZERO
    }
}

/// Ordered member list plus the aggregate amount locked in the deposit account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemberRoster {
    pub addresses: Vec<MemberAddress>,
    pub total_locked: Decimal,
}

impl MemberRoster {
    #[must_use]
    pub fn count(&self) -> usize {
        self.addresses.len()
    }
}

/// A group record as served by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Custodial / escrow account associated with the group.
    pub deposit_account: String,
    pub members: MemberRoster,
    pub member_details: Vec<Member>,
}

impl Group {
    /// Whether `address` belongs to this group.
    #[must_use]
    pub fn is_member(&self, address: &MemberAddress) -> bool {
        self.member_details.iter().any(|m| &m.address == address)
    }

    /// Member addresses in roster order, derived from `member_details`.
    #[must_use]
    pub fn member_addresses(&self) -> Vec<MemberAddress> {
        self.member_details.iter().map(|m| m.address.clone()).collect()
    }

    /// Balances carried on the record, as a snapshot.
    #[must_use]
    pub fn balance_map(&self) -> BalanceMap {
        self.member_details
            .iter()
            .map(|m| (m.address.clone(), m.net_balance))
            .collect()
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Group {
    /// A group whose members carry the given balances, in order.
    pub fn dummy(name: &str, balances: &[(&str, Decimal)]) -> Self {
        let member_details: Vec<Member> = balances
            .iter()
            .map(|(addr, bal)| Member::new(*addr).with_balance(*bal))
            .collect();
        Self {
            id: GroupId::new(),
            name: name.to_string(),
            deposit_account: format!("deposit:{name}"),
            members: MemberRoster {
                addresses: member_details.iter().map(|m| m.address.clone()).collect(),
                total_locked: Decimal::ZERO,
            },
            member_details,
        }
    }
}
