//! Settlement proposal lifecycle types.
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────────────────┐  quorum   ┌────────────────────┐
//!   │ PENDING_SIGNATURES ├──────────▶│ READY_TO_BROADCAST │
//!   └────────────────────┘           └─────────┬──────────┘
//!                                              │ ledger accepted
//!                                              ▼
//!                 ┌───────────┐  confirmed ┌───────────┐
//!                 │ COMPLETED │◀───────────┤ BROADCAST │
//!                 └───────────┘            └───────────┘
//! ```
//!
//! Transitions are forward-only. There is no cancel path: a proposal is
//! abandoned by creating a new one for the same group.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GroupId, MemberAddress, ProposalId, SettlementPayment};

/// Lifecycle state of a settlement proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Collecting authorizations.
    PendingSignatures,
    /// Quorum reached; may be handed to the ledger network.
    ReadyToBroadcast,
    /// Accepted by the ledger network, awaiting confirmation.
    Broadcast,
    /// Confirmed on the ledger. Terminal.
    Completed,
}

impl ProposalStatus {
    /// Can a proposal in this state move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::PendingSignatures, Self::ReadyToBroadcast)
                | (Self::ReadyToBroadcast, Self::Broadcast)
                | (Self::Broadcast, Self::Completed)
        )
    }

    /// Whether signatures may still be recorded.
    #[must_use]
    pub fn accepts_signatures(&self) -> bool {
        matches!(self, Self::PendingSignatures | Self::ReadyToBroadcast)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        *self == Self::Completed
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingSignatures => write!(f, "PENDING_SIGNATURES"),
            Self::ReadyToBroadcast => write!(f, "READY_TO_BROADCAST"),
            Self::Broadcast => write!(f, "BROADCAST"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// The authoritative proposal as served by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: ProposalId,
    pub group_id: GroupId,
    pub payments: Vec<SettlementPayment>,
    pub required_signatures: u32,
    pub collected_signatures: u32,
    /// Addresses credited with a signature, when the remote side tracks them.
    #[serde(default)]
    pub signers: Vec<MemberAddress>,
    pub status: ProposalStatus,
}

/// Opaque authorization returned by the signing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureToken(pub String);

/// Opaque acknowledgement returned by the ledger network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Ledger-side reference (e.g. a transaction hash).
    pub reference: String,
    pub confirmed_at: DateTime<Utc>,
}

impl Confirmation {
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            confirmed_at: Utc::now(),
        }
    }
}
