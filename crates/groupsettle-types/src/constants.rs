//! System-wide constants for the GroupSettle engine.

use rust_decimal::Decimal;

/// Default number of independent authorizations a proposal needs.
pub const DEFAULT_REQUIRED_SIGNATURES: u32 = 2;

/// Default period of the background balance refresh, in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5000;

/// Residual below which a debtor or creditor counts as settled (0.0001).
pub const NETTING_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Domain tag prefixed to every settlement plan digest.
pub const PLAN_ROOT_DOMAIN: &[u8] = b"groupsettle:plan_root:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "GroupSettle";
