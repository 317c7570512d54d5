//! The settlement proposal aggregate.
//!
//! Owns one settlement attempt: the immutable payment plan, the quorum,
//! the signature log, and the lifecycle status. All transitions are
//! validated here so a caller cannot skip a step, whatever the UI allows.

use chrono::{DateTime, Utc};
use groupsettle_netting::{compute_plan_root, plan_root_hex};
use groupsettle_types::{
    Confirmation, GroupId, GroupSettleError, MemberAddress, ProposalId, ProposalRecord,
    ProposalStatus, Result, SettlementPayment, SignatureToken, SignerPolicy,
};
use serde::{Deserialize, Serialize};

use crate::quorum::Quorum;

/// Where the proposal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalOrigin {
    /// Computed on this client from local balances.
    Local,
    /// Adopted from the persistence layer; authoritative.
    Remote,
}

/// One recorded authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEvent {
    pub signer: MemberAddress,
    pub token: SignatureToken,
    pub signed_at: DateTime<Utc>,
}

/// A settlement plan awaiting multi-party authorization and execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementProposal {
    id: ProposalId,
    group_id: GroupId,
    payments: Vec<SettlementPayment>,
    /// SHA-256 commitment to `payments`; the signing payload.
    plan_root: [u8; 32],
    quorum: Quorum,
    signatures: Vec<SignatureEvent>,
    status: ProposalStatus,
    origin: ProposalOrigin,
    confirmation: Option<Confirmation>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SettlementProposal {
    /// Create a proposal in PENDING_SIGNATURES with nothing collected.
    ///
    /// # Errors
    /// - `NothingToSettle` if `payments` is empty
    /// - `Configuration` if `required_signatures` is zero
    pub fn new(
        group_id: GroupId,
        payments: Vec<SettlementPayment>,
        required_signatures: u32,
        policy: SignerPolicy,
    ) -> Result<Self> {
        Self::with_id(ProposalId::new(), group_id, payments, required_signatures, policy)
    }

    /// As [`new`](Self::new), with a caller-chosen ID.
    pub fn with_id(
        id: ProposalId,
        group_id: GroupId,
        payments: Vec<SettlementPayment>,
        required_signatures: u32,
        policy: SignerPolicy,
    ) -> Result<Self> {
        if payments.is_empty() {
            return Err(GroupSettleError::NothingToSettle);
        }
        let quorum = Quorum::new(required_signatures, policy)?;
        let now = Utc::now();
        let plan_root = compute_plan_root(group_id, &payments);

        tracing::info!(
            proposal_id = %id,
            group_id = %group_id,
            payments = payments.len(),
            required_signatures,
            plan_root = %plan_root_hex(&plan_root),
            "settlement proposal created"
        );

        Ok(Self {
            id,
            group_id,
            payments,
            plan_root,
            quorum,
            signatures: Vec::new(),
            status: ProposalStatus::PendingSignatures,
            origin: ProposalOrigin::Local,
            confirmation: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Adopt the authoritative remote proposal.
    ///
    /// The remote status is taken as-is; counters are clamped into range.
    #[must_use]
    pub fn from_record(record: ProposalRecord, policy: SignerPolicy) -> Self {
        let now = Utc::now();
        let plan_root = compute_plan_root(record.group_id, &record.payments);
        Self {
            id: record.id,
            group_id: record.group_id,
            quorum: Quorum::restore(
                record.required_signatures,
                record.collected_signatures,
                policy,
                record.signers,
            ),
            payments: record.payments,
            plan_root,
            signatures: Vec::new(),
            status: record.status,
            origin: ProposalOrigin::Remote,
            confirmation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a newer remote view of this same proposal into local state.
    ///
    /// The quorum keeps the larger count and the union of signers. The
    /// remote status is taken only when it is further along, and may skip
    /// steps the local replica never observed. Returns whether anything
    /// changed; a record for another id is ignored.
    pub fn merge_remote(&mut self, record: &ProposalRecord) -> bool {
        if record.id != self.id {
            return false;
        }
        let mut changed = self
            .quorum
            .absorb(record.collected_signatures, record.signers.iter().cloned());

        if record.status > self.status {
            tracing::info!(
                proposal_id = %self.id,
                group_id = %self.group_id,
                from = %self.status,
                to = %record.status,
                "proposal status advanced by remote"
            );
            self.status = record.status;
            changed = true;
        } else if self.status == ProposalStatus::PendingSignatures && self.quorum.is_met() {
            self.transition(ProposalStatus::ReadyToBroadcast);
            changed = true;
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Snapshot in the persistence layer's shape.
    #[must_use]
    pub fn to_record(&self) -> ProposalRecord {
        ProposalRecord {
            id: self.id,
            group_id: self.group_id,
            payments: self.payments.clone(),
            required_signatures: self.quorum.required(),
            collected_signatures: self.quorum.collected(),
            signers: self.quorum.signers().iter().cloned().collect(),
            status: self.status,
        }
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> ProposalId {
        self.id
    }

    #[must_use]
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    #[must_use]
    pub fn payments(&self) -> &[SettlementPayment] {
        &self.payments
    }

    #[must_use]
    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    #[must_use]
    pub fn origin(&self) -> ProposalOrigin {
        self.origin
    }

    #[must_use]
    pub fn required_signatures(&self) -> u32 {
        self.quorum.required()
    }

    #[must_use]
    pub fn collected_signatures(&self) -> u32 {
        self.quorum.collected()
    }

    #[must_use]
    pub fn quorum(&self) -> &Quorum {
        &self.quorum
    }

    #[must_use]
    pub fn signatures(&self) -> &[SignatureEvent] {
        &self.signatures
    }

    #[must_use]
    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The digest every signer authorizes.
    #[must_use]
    pub fn signing_payload(&self) -> [u8; 32] {
        self.plan_root
    }

    #[must_use]
    pub fn signing_payload_hex(&self) -> String {
        plan_root_hex(&self.plan_root)
    }

    // -----------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------

    /// Whether `signer` may sign right now. Call before contacting the
    /// signing collaborator so a doomed request is never sent.
    ///
    /// # Errors
    /// - `NotReady` once the proposal has been broadcast
    /// - `DuplicateSigner` if the policy counts distinct signers and
    ///   `signer` is already credited
    pub fn check_can_sign(&self, signer: &MemberAddress) -> Result<()> {
        if !self.status.accepts_signatures() {
            return Err(GroupSettleError::NotReady {
                operation: "sign",
                status: self.status,
            });
        }
        self.quorum.check(signer)
    }

    /// Record an authorization obtained from the signing collaborator.
    ///
    /// Moves to READY_TO_BROADCAST when the quorum is met. Signing an
    /// already-ready proposal is accepted but the count stays at the cap.
    pub fn record_signature(
        &mut self,
        signer: &MemberAddress,
        token: SignatureToken,
    ) -> Result<ProposalStatus> {
        self.check_can_sign(signer)?;
        self.quorum.credit(signer)?;

        let now = Utc::now();
        self.signatures.push(SignatureEvent {
            signer: signer.clone(),
            token,
            signed_at: now,
        });
        self.updated_at = now;

        tracing::debug!(
            proposal_id = %self.id,
            signer = %signer,
            collected = self.quorum.collected(),
            required = self.quorum.required(),
            "signature recorded"
        );

        if self.quorum.is_met() && self.status == ProposalStatus::PendingSignatures {
            self.transition(ProposalStatus::ReadyToBroadcast);
        }
        Ok(self.status)
    }

    /// Guard a broadcast attempt.
    ///
    /// # Errors
    /// Returns `NotReady` unless the status is READY_TO_BROADCAST.
    pub fn ensure_ready_to_broadcast(&self) -> Result<()> {
        if self.status == ProposalStatus::ReadyToBroadcast {
            Ok(())
        } else {
            Err(GroupSettleError::NotReady {
                operation: "broadcast",
                status: self.status,
            })
        }
    }

    /// Record the ledger network's acceptance (→ BROADCAST).
    pub fn mark_broadcast(&mut self, confirmation: Confirmation) -> Result<()> {
        self.ensure_ready_to_broadcast()?;
        self.confirmation = Some(confirmation);
        self.transition(ProposalStatus::Broadcast);
        Ok(())
    }

    /// Record the external confirmation event (→ COMPLETED).
    ///
    /// # Errors
    /// Returns `NotReady` unless the status is BROADCAST.
    pub fn mark_completed(&mut self, confirmation: Confirmation) -> Result<()> {
        if self.status != ProposalStatus::Broadcast {
            return Err(GroupSettleError::NotReady {
                operation: "complete",
                status: self.status,
            });
        }
        self.confirmation = Some(confirmation);
        self.transition(ProposalStatus::Completed);
        Ok(())
    }

    fn transition(&mut self, target: ProposalStatus) {
        debug_assert!(self.status.can_transition_to(target));
        tracing::info!(
            proposal_id = %self.id,
            group_id = %self.group_id,
            from = %self.status,
            to = %target,
            "proposal status changed"
        );
        self.status = target;
        self.updated_at = Utc::now();
    }
}
