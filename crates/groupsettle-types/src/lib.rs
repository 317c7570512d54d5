//! # groupsettle-types
//!
//! Shared types, errors, and configuration for the **GroupSettle** engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`GroupId`], [`ProposalId`], [`MemberAddress`]
//! - **Group model**: [`Group`], [`Member`], [`MemberStatus`], [`MemberRoster`]
//! - **Mutation model**: [`Iou`], [`BalanceMap`]
//! - **Settlement model**: [`SettlementPayment`], [`ProposalStatus`], [`ProposalRecord`]
//! - **Collaborator results**: [`SignatureToken`], [`Confirmation`]
//! - **Configuration**: [`SettlementConfig`], [`NettingOrder`], [`SignerPolicy`]
//! - **Errors**: [`GroupSettleError`] with `GS_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod group;
pub mod ids;
pub mod iou;
pub mod proposal;

// Re-export all primary types at crate root:
//   use groupsettle_types::{Member, Iou, SettlementPayment, ...};

pub use config::*;
pub use error::*;
pub use group::*;
pub use ids::*;
pub use iou::*;
pub use proposal::*;

// Constants are accessed via `groupsettle_types::constants::FOO`.
