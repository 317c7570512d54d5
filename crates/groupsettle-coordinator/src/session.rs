//! One group's owned state inside the coordinator arena.

use groupsettle_ledger::{BalanceLedger, DebtGraph, MembershipLock};
use groupsettle_settlement::SettlementProposal;
use groupsettle_types::{BalanceMap, Group, ProposalRecord, Result, SignerPolicy};

use crate::tasks::TaskHandle;

#[derive(Debug)]
pub(crate) struct GroupSession {
    pub group: Group,
    pub ledger: BalanceLedger,
    pub debts: DebtGraph,
    pub proposal: Option<SettlementProposal>,
    pub lock: MembershipLock,
    /// Tag carried by this session's background results.
    pub generation: u64,
    refresh_task: Option<TaskHandle>,
    fetch_task: Option<TaskHandle>,
}

impl GroupSession {
    pub fn new(group: Group, generation: u64) -> Self {
        Self {
            ledger: BalanceLedger::new(group.member_details.clone()),
            debts: DebtGraph::new(),
            proposal: None,
            lock: MembershipLock::new(group.id),
            generation,
            refresh_task: None,
            fetch_task: None,
            group,
        }
    }

    /// Take a freshly fetched group record as the new local truth.
    ///
    /// Fails without touching anything if the member set changed while a
    /// settlement cycle is open.
    pub fn adopt_group(&mut self, group: Group) -> Result<()> {
        let current = self.group.member_addresses();
        let incoming = group.member_addresses();
        self.lock.check_change(&current, &incoming)?;

        if current != incoming {
            tracing::info!(
                group_id = %group.id,
                before = current.len(),
                after = incoming.len(),
                "group membership changed"
            );
            self.debts.clear();
        }

        self.ledger.replace(group.member_details.clone());
        self.group = group;
        Ok(())
    }

    pub fn merge_balances(&mut self, remote: &BalanceMap) {
        self.ledger.merge_remote(remote);
    }

    /// Install a proposal created on this client, superseding any other.
    pub fn install_proposal(&mut self, proposal: SettlementProposal) {
        if let Some(previous) = self.proposal.as_ref().filter(|p| !p.status().is_terminal()) {
            tracing::info!(
                group_id = %self.group.id,
                superseded = %previous.id(),
                collected = previous.collected_signatures(),
                replacement = %proposal.id(),
                "open proposal superseded; its signatures no longer count"
            );
        }
        self.lock.set_status(Some(proposal.status()));
        self.proposal = Some(proposal);
    }

    /// Fold the authoritative proposal over the local one.
    ///
    /// A different proposal wins unless it is finished and ours is still
    /// live. The same proposal is merged: the quorum keeps the larger count
    /// and every credited signer, and the status only moves forward.
    pub fn adopt_remote(&mut self, record: ProposalRecord, policy: SignerPolicy) -> bool {
        if record.group_id != self.group.id {
            tracing::warn!(
                group_id = %self.group.id,
                record_group = %record.group_id,
                "ignoring proposal record for another group"
            );
            return false;
        }

        if let Some(local) = self.proposal.as_mut().filter(|p| p.id() == record.id) {
            let merged = local.merge_remote(&record);
            if merged {
                tracing::info!(
                    group_id = %self.group.id,
                    proposal_id = %record.id,
                    status = %local.status(),
                    collected = local.collected_signatures(),
                    "merged remote proposal"
                );
            } else {
                tracing::debug!(
                    group_id = %self.group.id,
                    proposal_id = %record.id,
                    "remote proposal is behind local state; kept local"
                );
            }
            self.sync_lock();
            return merged;
        }

        let displace = self.proposal.as_ref().is_none_or(|local| {
            !(record.status.is_terminal() && !local.status().is_terminal())
        });
        if !displace {
            tracing::debug!(
                group_id = %self.group.id,
                proposal_id = %record.id,
                "finished remote proposal ignored while local one is live"
            );
            return false;
        }

        let proposal = SettlementProposal::from_record(record, policy);
        tracing::info!(
            group_id = %self.group.id,
            proposal_id = %proposal.id(),
            status = %proposal.status(),
            collected = proposal.collected_signatures(),
            "adopted remote proposal"
        );
        self.lock.set_status(Some(proposal.status()));
        self.proposal = Some(proposal);
        true
    }

    /// Keep the lock in step after a local transition.
    pub fn sync_lock(&mut self) {
        self.lock
            .set_status(self.proposal.as_ref().map(SettlementProposal::status));
    }

    pub fn set_refresh_task(&mut self, handle: TaskHandle) {
        if let Some(old) = self.refresh_task.replace(handle) {
            old.cancel();
        }
    }

    pub fn set_fetch_task(&mut self, handle: TaskHandle) {
        if let Some(old) = self.fetch_task.replace(handle) {
            old.cancel();
        }
    }

    /// Cancel both background tasks.
    pub fn shutdown(&mut self) {
        for handle in [self.refresh_task.take(), self.fetch_task.take()]
            .into_iter()
            .flatten()
        {
            handle.cancel();
        }
    }
}
