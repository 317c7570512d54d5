//! # groupsettle-coordinator
//!
//! The **Group Coordinator**: ties the ledger, netting, and proposal state
//! machine to the external collaborators and reconciles local with remote
//! truth.
//!
//! - [`GroupCoordinator`]: arena of per-group sessions keyed by [`GroupId`]
//! - [`Collaborators`]: the [`GroupDirectory`], [`SigningService`],
//!   [`LedgerNetwork`], and [`IdentityProvider`] contracts it drives
//!
//! Each session runs a periodic balance refresh and a one-shot proposal
//! fetch in the background. Their results are applied on the coordinator's
//! next call; results from an ended session are ignored.
//!
//! [`GroupId`]: groupsettle_types::GroupId

pub mod collaborators;
pub mod coordinator;
mod session;
mod tasks;

pub use collaborators::{GroupDirectory, IdentityProvider, LedgerNetwork, SigningService};
pub use coordinator::{Collaborators, GroupCoordinator};
