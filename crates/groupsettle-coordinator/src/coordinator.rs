//! The group coordinator façade.
//!
//! ## Session Lifecycle
//!
//! ```text
//!   load_group ──▶ session open ──────────────────────────▶ close_session
//!                  │  refresh task (every refresh_interval)    │ cancels both
//!                  │  proposal fetch (one-shot)                │ tasks; late
//!                  ▼                                           │ results are
//!           results queued on the update channel,              │ discarded
//!           applied at the start of every operation            ▼
//! ```
//!
//! Every public operation takes `&mut self`, so writes to a session are
//! serialized by construction. The only awaits are collaborator calls;
//! ledger, netting, and proposal transitions run synchronously in between.
//! A collaborator failure is surfaced before any local state changes.

use std::collections::HashMap;
use std::sync::Arc;

use groupsettle_ledger::{ZeroSumCheck, apply_iou};
use groupsettle_ledger::debt_graph::DebtEdge;
use groupsettle_netting::compute_settlement_with_epsilon;
use groupsettle_settlement::{ProposalOrigin, SettlementProposal};
use groupsettle_types::constants::{ENGINE_NAME, VERSION};
use groupsettle_types::{
    BalanceMap, CollaboratorError, Confirmation, Group, GroupId, GroupSettleError, Iou, Member,
    MemberAddress, ProposalId, ProposalStatus, Result, SettlementConfig, SignerPolicy,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::collaborators::{GroupDirectory, IdentityProvider, LedgerNetwork, SigningService};
use crate::session::GroupSession;
use crate::tasks::{
    SessionUpdate, TaggedUpdate, UpdateSender, spawn_balance_refresh, spawn_proposal_fetch,
};

/// The external services a coordinator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn GroupDirectory>,
    pub signer: Arc<dyn SigningService>,
    pub network: Arc<dyn LedgerNetwork>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Owns every open group session and mediates all access to them.
pub struct GroupCoordinator {
    config: SettlementConfig,
    collaborators: Collaborators,
    sessions: HashMap<GroupId, GroupSession>,
    next_generation: u64,
    updates_tx: UpdateSender,
    updates_rx: mpsc::UnboundedReceiver<TaggedUpdate>,
}

impl GroupCoordinator {
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn new(collaborators: Collaborators, config: SettlementConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            engine = ENGINE_NAME,
            version = VERSION,
            required_signatures = config.required_signatures,
            signer_policy = ?config.signer_policy,
            "settlement coordinator started"
        );
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            collaborators,
            sessions: HashMap::new(),
            next_generation: 1,
            updates_tx,
            updates_rx,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    // =================================================================
    // Session lifecycle
    // =================================================================

    /// Fetch the authoritative group record and merge it into local state.
    ///
    /// Opens a session (and its background tasks) the first time a group is
    /// loaded. On failure local state is unchanged and nothing is retried.
    ///
    /// # Errors
    /// - `GroupNotFound` if the directory does not know the group
    /// - `CollaboratorFailure` for any other directory failure
    /// - `MembershipChanged` if the member set differs during an open cycle
    pub async fn load_group(&mut self, group_id: GroupId) -> Result<&Group> {
        self.sync();

        let directory = Arc::clone(&self.collaborators.directory);
        let group = directory.get_group(group_id).await.map_err(|err| match err {
            CollaboratorError::NotFound(_) => GroupSettleError::GroupNotFound(group_id),
            other => GroupSettleError::CollaboratorFailure(other),
        })?;

        if group.id != group_id {
            return Err(GroupSettleError::Internal(format!(
                "directory returned group {} for {group_id}",
                group.id
            )));
        }

        if let Some(session) = self.sessions.get_mut(&group_id) {
            session.adopt_group(group)?;
            tracing::debug!(group_id = %group_id, "group reloaded");
        } else {
            let generation = self.next_generation;
            self.next_generation += 1;
            let mut session = GroupSession::new(group, generation);
            session.set_refresh_task(spawn_balance_refresh(
                Arc::clone(&directory),
                group_id,
                generation,
                self.config.refresh_interval(),
                self.updates_tx.clone(),
            ));
            session.set_fetch_task(spawn_proposal_fetch(
                directory,
                group_id,
                generation,
                self.updates_tx.clone(),
            ));
            tracing::info!(
                group_id = %group_id,
                generation,
                members = session.group.members.count(),
                "group session opened"
            );
            self.sessions.insert(group_id, session);
        }

        Ok(&self.session(group_id)?.group)
    }

    /// End a session, cancelling its background tasks.
    ///
    /// Returns `false` if no session was open.
    pub fn close_session(&mut self, group_id: GroupId) -> bool {
        let Some(mut session) = self.sessions.remove(&group_id) else {
            return false;
        };
        session.shutdown();
        tracing::info!(
            group_id = %group_id,
            generation = session.generation,
            "group session closed"
        );
        true
    }

    /// Close every other session and load `group_id`.
    pub async fn switch_to(&mut self, group_id: GroupId) -> Result<&Group> {
        let others: Vec<GroupId> = self
            .sessions
            .keys()
            .copied()
            .filter(|id| *id != group_id)
            .collect();
        for id in others {
            self.close_session(id);
        }
        self.load_group(group_id).await
    }

    #[must_use]
    pub fn has_session(&self, group_id: GroupId) -> bool {
        self.sessions.contains_key(&group_id)
    }

    /// Apply every queued background result. Returns how many were applied.
    ///
    /// Results from closed or replaced sessions are dropped.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(tagged) = self.updates_rx.try_recv() {
            let policy = self.config.signer_policy;
            let Some(session) = self
                .sessions
                .get_mut(&tagged.group_id)
                .filter(|s| s.generation == tagged.generation)
            else {
                tracing::warn!(
                    group_id = %tagged.group_id,
                    generation = tagged.generation,
                    "discarding result from an ended session"
                );
                continue;
            };

            match tagged.update {
                SessionUpdate::Balances(remote) => {
                    tracing::debug!(
                        group_id = %tagged.group_id,
                        entries = remote.len(),
                        "applying refreshed balances"
                    );
                    session.merge_balances(&remote);
                }
                SessionUpdate::Proposal(Some(record)) => {
                    session.adopt_remote(record, policy);
                }
                SessionUpdate::Proposal(None) => {}
            }
            applied += 1;
        }
        applied
    }

    /// Fetch and merge the authoritative balances now.
    ///
    /// Failures are logged and swallowed. Returns whether a snapshot was
    /// merged.
    ///
    /// # Errors
    /// Only `SessionNotOpen`.
    pub async fn refresh_balances(&mut self, group_id: GroupId) -> Result<bool> {
        self.sync();
        self.session(group_id)?;

        let directory = Arc::clone(&self.collaborators.directory);
        match directory.get_balances(group_id).await {
            Ok(remote) => {
                self.session_mut(group_id)?.merge_balances(&remote);
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(group_id = %group_id, error = %err, "balance refresh failed");
                Ok(false)
            }
        }
    }

    /// Re-run the one-shot proposal fetch for an open session.
    pub fn request_proposal_refresh(&mut self, group_id: GroupId) -> Result<()> {
        self.sync();
        let directory = Arc::clone(&self.collaborators.directory);
        let updates = self.updates_tx.clone();
        let session = self.session_mut(group_id)?;
        let generation = session.generation;
        session.set_fetch_task(spawn_proposal_fetch(directory, group_id, generation, updates));
        Ok(())
    }

    // =================================================================
    // Ledger operations
    // =================================================================

    /// Apply an IOU to local state immediately.
    ///
    /// The next successful refresh overwrites any drift.
    ///
    /// # Errors
    /// `InvalidIou` for a non-positive amount, a self-debt, a non-member,
    /// or a balance that would overflow; local state is unchanged.
    pub fn record_iou(&mut self, group_id: GroupId, iou: &Iou) -> Result<()> {
        self.sync();
        let session = self.session_mut(group_id)?;
        let updated = apply_iou(session.ledger.members(), iou)?;
        let cycle = session.debts.add_iou(iou)?;
        session.ledger.replace(updated);

        if let Some(cycle) = cycle {
            tracing::debug!(
                group_id = %group_id,
                cycle_len = cycle.len().saturating_sub(1),
                "debt cycle cancelled"
            );
        }
        Ok(())
    }

    // =================================================================
    // Proposal operations
    // =================================================================

    /// Net the current local balances into a new proposal.
    ///
    /// Any open proposal is superseded and its signatures are dropped.
    ///
    /// # Errors
    /// - `NothingToSettle` if every balance is already settled
    /// - `NotReady` while the current proposal is being executed
    pub fn propose_settlement(&mut self, group_id: GroupId) -> Result<ProposalId> {
        self.sync();
        let config = self.config.clone();
        let session = self.session_mut(group_id)?;

        if let Some(current) = &session.proposal {
            if current.status() == ProposalStatus::Broadcast {
                return Err(GroupSettleError::NotReady {
                    operation: "propose",
                    status: current.status(),
                });
            }
        }

        let members = session.ledger.members();
        if let Err(err) = ZeroSumCheck::new()
            .tolerance(config.amount_epsilon)
            .verify(members)
        {
            tracing::warn!(group_id = %group_id, error = %err, "netting a non-zero-sum group");
        }

        let payments =
            compute_settlement_with_epsilon(members, config.netting_order, config.amount_epsilon);
        let proposal = SettlementProposal::new(
            group_id,
            payments,
            config.required_signatures,
            config.signer_policy,
        )?;
        let proposal_id = proposal.id();
        session.install_proposal(proposal);
        Ok(proposal_id)
    }

    /// Obtain the current member's authorization and credit it.
    ///
    /// Eligibility is checked before the signing service is contacted. On
    /// a signing failure the proposal is unchanged.
    ///
    /// # Errors
    /// - `ProposalNotFound` if `proposal_id` is not the group's current proposal
    /// - `NotGroupMember` if distinct signers are required and the current
    ///   member is not in the group
    /// - `DuplicateSigner`, `NotReady` from the proposal
    /// - `CollaboratorFailure` from identity or signing
    pub async fn sign(
        &mut self,
        group_id: GroupId,
        proposal_id: ProposalId,
    ) -> Result<ProposalStatus> {
        self.sync();
        self.proposal_mut(group_id, proposal_id)?;

        // Identity is resolved before any eligibility check.
        let identity = Arc::clone(&self.collaborators.identity);
        let signer = identity.current_member().await?;

        let policy = self.config.signer_policy;
        let session = self.session(group_id)?;
        if policy == SignerPolicy::DistinctSigners && !session.ledger.contains(&signer) {
            return Err(GroupSettleError::NotGroupMember(signer));
        }
        let proposal = self.proposal_mut(group_id, proposal_id)?;
        proposal.check_can_sign(&signer)?;
        let payload = proposal.signing_payload();

        tracing::debug!(
            group_id = %group_id,
            proposal_id = %proposal_id,
            signer = %signer,
            payload = %proposal.signing_payload_hex(),
            "requesting signature"
        );
        let signing = Arc::clone(&self.collaborators.signer);
        let token = signing
            .request_signature(proposal_id, &signer, payload)
            .await?;

        let proposal = self.proposal_mut(group_id, proposal_id)?;
        let status = proposal.record_signature(&signer, token)?;
        let origin = proposal.origin();
        self.session_mut(group_id)?.sync_lock();
        self.follow_remote(group_id, origin)?;
        Ok(status)
    }

    /// Ask the ledger network to execute a fully signed proposal.
    ///
    /// # Errors
    /// - `NotReady` unless the proposal is READY_TO_BROADCAST
    /// - `CollaboratorFailure` if the network refuses; the proposal stays
    ///   ready so the caller may retry
    pub async fn broadcast(
        &mut self,
        group_id: GroupId,
        proposal_id: ProposalId,
    ) -> Result<Confirmation> {
        self.sync();
        let proposal = self.proposal_mut(group_id, proposal_id)?;
        proposal.ensure_ready_to_broadcast()?;
        let payments = proposal.payments().to_vec();

        let network = Arc::clone(&self.collaborators.network);
        let confirmation = network.request_broadcast(proposal_id, &payments).await?;

        let proposal = self.proposal_mut(group_id, proposal_id)?;
        proposal.mark_broadcast(confirmation.clone())?;
        let origin = proposal.origin();
        tracing::info!(
            group_id = %group_id,
            proposal_id = %proposal_id,
            reference = %confirmation.reference,
            payments = payments.len(),
            "settlement broadcast"
        );
        self.session_mut(group_id)?.sync_lock();
        self.follow_remote(group_id, origin)?;
        Ok(confirmation)
    }

    /// Record the external confirmation that a broadcast settled.
    ///
    /// Releases the membership lock.
    ///
    /// # Errors
    /// `NotReady` unless the proposal is BROADCAST.
    pub fn confirm_completion(
        &mut self,
        group_id: GroupId,
        proposal_id: ProposalId,
        confirmation: Confirmation,
    ) -> Result<()> {
        self.sync();
        self.proposal_mut(group_id, proposal_id)?
            .mark_completed(confirmation)?;
        self.session_mut(group_id)?.sync_lock();
        Ok(())
    }

    // =================================================================
    // Read-only accessors (call `sync` first for the freshest view)
    // =================================================================

    pub fn group(&self, group_id: GroupId) -> Result<&Group> {
        Ok(&self.session(group_id)?.group)
    }

    pub fn balances(&self, group_id: GroupId) -> Result<&[Member]> {
        Ok(self.session(group_id)?.ledger.members())
    }

    pub fn balance_snapshot(&self, group_id: GroupId) -> Result<BalanceMap> {
        Ok(self.session(group_id)?.ledger.snapshot())
    }

    pub fn balance_of(&self, group_id: GroupId, address: &MemberAddress) -> Result<Option<Decimal>> {
        Ok(self.session(group_id)?.ledger.balance_of(address))
    }

    pub fn proposal(&self, group_id: GroupId) -> Result<Option<&SettlementProposal>> {
        Ok(self.session(group_id)?.proposal.as_ref())
    }

    /// Bilateral debts recorded this session, after cycle cancellation.
    pub fn outstanding_debts(&self, group_id: GroupId) -> Result<&[DebtEdge]> {
        Ok(self.session(group_id)?.debts.edges())
    }

    // =================================================================
    // Internals
    // =================================================================

    fn session(&self, group_id: GroupId) -> Result<&GroupSession> {
        self.sessions
            .get(&group_id)
            .ok_or(GroupSettleError::SessionNotOpen(group_id))
    }

    fn session_mut(&mut self, group_id: GroupId) -> Result<&mut GroupSession> {
        self.sessions
            .get_mut(&group_id)
            .ok_or(GroupSettleError::SessionNotOpen(group_id))
    }

    fn proposal_mut(
        &mut self,
        group_id: GroupId,
        proposal_id: ProposalId,
    ) -> Result<&mut SettlementProposal> {
        self.session_mut(group_id)?
            .proposal
            .as_mut()
            .filter(|p| p.id() == proposal_id)
            .ok_or(GroupSettleError::ProposalNotFound(proposal_id))
    }

    /// After acting on a remote proposal, pull the authoritative record so
    /// it can supersede the local view.
    fn follow_remote(&mut self, group_id: GroupId, origin: ProposalOrigin) -> Result<()> {
        if origin == ProposalOrigin::Remote {
            self.request_proposal_refresh(group_id)?;
        }
        Ok(())
    }
}

impl Drop for GroupCoordinator {
    fn drop(&mut self) {
        for session in self.sessions.values_mut() {
            session.shutdown();
        }
    }
}
