//! Cycle-aware membership lock.
//!
//! A settlement plan is computed over a fixed member set. While a proposal
//! is open (anything short of COMPLETED), adding or removing members would
//! invalidate the plan, so member-set changes are refused until the cycle
//! ends.

use groupsettle_types::{GroupId, GroupSettleError, MemberAddress, ProposalStatus, Result};

/// Lock that blocks member-set changes while a settlement cycle is open.
#[derive(Debug, Clone)]
pub struct MembershipLock {
    group_id: GroupId,
    /// Status of the group's current proposal, if any.
    proposal_status: Option<ProposalStatus>,
}

impl MembershipLock {
    /// A lock with no open cycle.
    #[must_use]
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            proposal_status: None,
        }
    }

    /// Track the status of the group's current proposal.
    pub fn set_status(&mut self, status: Option<ProposalStatus>) {
        self.proposal_status = status;
    }

    #[must_use]
    pub fn proposal_status(&self) -> Option<ProposalStatus> {
        self.proposal_status
    }

    /// Whether the member set may change right now.
    #[must_use]
    pub fn changes_allowed(&self) -> bool {
        self.proposal_status
            .is_none_or(|status| status.is_terminal())
    }

    /// Guard a transition from `current` to `incoming` member addresses.
    ///
    /// Identical sets (in any order) always pass.
    ///
    /// # Errors
    /// Returns [`GroupSettleError::MembershipChanged`] if the sets differ
    /// while a cycle is open.
    pub fn check_change(&self, current: &[MemberAddress], incoming: &[MemberAddress]) -> Result<()> {
        if same_members(current, incoming) || self.changes_allowed() {
            Ok(())
        } else {
            Err(GroupSettleError::MembershipChanged(self.group_id))
        }
    }
}

fn same_members(a: &[MemberAddress], b: &[MemberAddress]) -> bool {
    let mut a: Vec<&MemberAddress> = a.iter().collect();
    let mut b: Vec<&MemberAddress> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}
