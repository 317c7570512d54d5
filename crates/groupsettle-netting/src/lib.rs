//! # groupsettle-netting
//!
//! **Pure deterministic netting for GroupSettle.**
//!
//! Takes a balance snapshot and produces the settlement plan that clears
//! every non-zero balance:
//!
//! - **Zero side effects**: no I/O, never suspends
//! - **Deterministic output**: same members in the same order and the same
//!   [`NettingOrder`](groupsettle_types::NettingOrder) give the same plan
//! - **Bounded**: at most `debtors + creditors - 1` payments
//! - **Auditable**: [`compute_plan_root`] commits to the exact plan

pub mod determinism;
pub mod netting;

pub use determinism::{compute_plan_root, plan_root_hex, verify_plan_root};
pub use netting::{compute_settlement, compute_settlement_with_epsilon};
