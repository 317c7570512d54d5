//! Error types for the GroupSettle engine.
//!
//! All errors use the `GS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Ledger input errors
//! - 2xx: Lookup errors
//! - 3xx: Proposal state errors
//! - 4xx: Collaborator errors
//! - 9xx: Configuration / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{GroupId, MemberAddress, ProposalId, ProposalStatus};

/// Failures reported by an external collaborator (persistence layer,
/// signing device, ledger network). Surfaced verbatim, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The remote side has no record of the requested entity.
    #[error("not found: {0}")]
    NotFound(String),

    /// The member declined to authorize on their signing device.
    #[error("signature request rejected by user")]
    UserRejected,

    /// The signing device or service failed.
    #[error("signing device error: {0}")]
    DeviceError(String),

    /// The ledger network refused the payment set.
    #[error("rejected by network: {0}")]
    RejectedByNetwork(String),

    /// The collaborator gave up waiting.
    #[error("collaborator timed out")]
    Timeout,

    /// The ledger network has already executed this payment set.
    #[error("already broadcast")]
    AlreadyBroadcast,

    /// The request/response transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Central error enum for all GroupSettle operations.
#[derive(Debug, Error)]
pub enum GroupSettleError {
    // =================================================================
    // Ledger Input Errors (1xx)
    // =================================================================
    /// The IOU failed validation (non-positive amount, self-debt, unknown member).
    #[error("GS_ERR_100: Invalid IOU: {reason}")]
    InvalidIou { reason: String },

    /// The address does not belong to the group.
    #[error("GS_ERR_101: {0} is not a member of the group")]
    NotGroupMember(MemberAddress),

    /// The group's member set changed while a settlement cycle is open.
    #[error("GS_ERR_102: Membership of group {0} changed during an open settlement cycle")]
    MembershipChanged(GroupId),

    /// Member balances no longer sum to the expected group total.
    #[error("GS_ERR_103: Conservation violated: expected total {expected}, actual {actual}")]
    ConservationViolation { expected: Decimal, actual: Decimal },

    // =================================================================
    // Lookup Errors (2xx)
    // =================================================================
    /// The group is unknown locally or remotely.
    #[error("GS_ERR_200: Group not found: {0}")]
    GroupNotFound(GroupId),

    /// No proposal with this ID is active for the group.
    #[error("GS_ERR_201: Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    /// The operation needs an open session for the group.
    #[error("GS_ERR_202: No open session for group {0}")]
    SessionNotOpen(GroupId),

    // =================================================================
    // Proposal State Errors (3xx)
    // =================================================================
    /// An operation was attempted out of state-machine order.
    #[error("GS_ERR_300: Cannot {operation} while proposal is {status}")]
    NotReady {
        operation: &'static str,
        status: ProposalStatus,
    },

    /// Every balance is already settled; there is nothing to propose.
    #[error("GS_ERR_301: Nothing to settle")]
    NothingToSettle,

    /// This member has already been credited with a signature.
    #[error("GS_ERR_302: {0} has already signed this proposal")]
    DuplicateSigner(MemberAddress),

    // =================================================================
    // Collaborator Errors (4xx)
    // =================================================================
    /// An external collaborator failed. Local state is unchanged.
    #[error("GS_ERR_400: Collaborator failure: {0}")]
    CollaboratorFailure(#[from] CollaboratorError),

    // =================================================================
    // Configuration / Internal (9xx)
    // =================================================================
    /// Configuration error (out-of-range value, malformed file, etc.).
    #[error("GS_ERR_900: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("GS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Unrecoverable internal error.
    #[error("GS_ERR_999: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, GroupSettleError>;

impl From<serde_json::Error> for GroupSettleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
