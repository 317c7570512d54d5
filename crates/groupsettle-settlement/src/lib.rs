//! # groupsettle-settlement
//!
//! **Settlement proposal state machine**: the lifecycle of one settlement
//! attempt for a group.
//!
//! ## Lifecycle
//!
//! A [`SettlementProposal`] is created from a netted payment plan and then:
//! 1. Collects authorizations until the [`Quorum`] is met
//!    (PENDING_SIGNATURES → READY_TO_BROADCAST)
//! 2. Is accepted by the ledger network (→ BROADCAST)
//! 3. Is confirmed on the ledger (→ COMPLETED)
//!
//! The payment set and its plan root are fixed at creation. Every
//! transition is forward-only and checked; an out-of-order request fails
//! with `NotReady` and leaves the proposal untouched.
//!
//! This crate never talks to collaborators. Callers obtain the signature
//! or ledger confirmation first and record it here only on success.

pub mod proposal;
pub mod quorum;

pub use proposal::{ProposalOrigin, SettlementProposal, SignatureEvent};
pub use quorum::Quorum;
