//! Contracts for the external collaborators the coordinator drives.
//!
//! Each call is a suspension point. Implementations enforce their own
//! timeouts; the coordinator never retries.

use async_trait::async_trait;
use groupsettle_types::{
    BalanceMap, CollaboratorError, Confirmation, Group, GroupId, MemberAddress, ProposalId,
    ProposalRecord, SettlementPayment, SignatureToken,
};

/// Persistence/transport layer holding the authoritative group state.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Fails with [`CollaboratorError::NotFound`] for an unknown group.
    async fn get_group(&self, group_id: GroupId) -> Result<Group, CollaboratorError>;

    /// Authoritative balances. May be partial or empty.
    async fn get_balances(&self, group_id: GroupId) -> Result<BalanceMap, CollaboratorError>;

    async fn get_settlement_proposal(
        &self,
        group_id: GroupId,
    ) -> Result<Option<ProposalRecord>, CollaboratorError>;
}

/// The member's signing device or wallet.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Ask `signer` to authorize the plan committed to by `payload`.
    async fn request_signature(
        &self,
        proposal_id: ProposalId,
        signer: &MemberAddress,
        payload: [u8; 32],
    ) -> Result<SignatureToken, CollaboratorError>;
}

/// The settlement ledger that executes payment sets.
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    async fn request_broadcast(
        &self,
        proposal_id: ProposalId,
        payments: &[SettlementPayment],
    ) -> Result<Confirmation, CollaboratorError>;
}

/// Resolves who is operating this client.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_member(&self) -> Result<MemberAddress, CollaboratorError>;
}
