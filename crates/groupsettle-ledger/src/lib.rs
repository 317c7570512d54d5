//! # groupsettle-ledger
//!
//! **Balance Ledger** for GroupSettle: the client-side view of each
//! member's net balance.
//!
//! - [`apply_iou`] adjusts a debtor/creditor pair by the same amount, so
//!   the group total is conserved under any sequence of valid IOUs
//! - [`merge_remote_balances`] folds an authoritative snapshot over local
//!   optimistic state; remote values always win for the addresses they cover
//! - [`DebtGraph`] keeps the bilateral "who owes whom" edges and cancels
//!   debt cycles as they close
//! - [`ZeroSumCheck`] verifies the conservation invariant
//! - [`MembershipLock`] refuses member-set changes during an open cycle
//!
//! Everything here is synchronous and performs no I/O.

pub mod conservation;
pub mod debt_graph;
pub mod ledger;
pub mod membership_lock;

pub use conservation::ZeroSumCheck;
pub use debt_graph::DebtGraph;
pub use ledger::{BalanceLedger, apply_iou, merge_remote_balances, net_total};
pub use membership_lock::MembershipLock;
