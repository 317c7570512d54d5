//! Plan digest for signing and audit.
//!
//! Every signer must authorize the exact same payment set. The plan root
//! is a SHA-256 hash over the ordered payments; it doubles as the signing
//! payload handed to the signing collaborator.

use groupsettle_types::{GroupId, SettlementPayment, constants::PLAN_ROOT_DOMAIN};
use sha2::{Digest, Sha256};

/// Compute the plan root over a group's ordered payment set.
///
/// Depends on:
/// - The group ID
/// - The number of payments
/// - Each payment's from, to, and amount (in order)
///
/// Amounts are hashed in normalized form, so `30` and `30.00` commit to
/// the same plan.
#[must_use]
pub fn compute_plan_root(group_id: GroupId, payments: &[SettlementPayment]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PLAN_ROOT_DOMAIN);
    hasher.update(group_id.0.as_bytes());
    hasher.update((payments.len() as u64).to_le_bytes());

    for payment in payments {
        // Length-prefix addresses so ("ab","c") and ("a","bc") differ.
        for address in [&payment.from, &payment.to] {
            hasher.update((address.as_str().len() as u64).to_le_bytes());
            hasher.update(address.as_str().as_bytes());
        }
        hasher.update(payment.amount.normalize().to_string().as_bytes());
        hasher.update(b";");
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Verify that `expected_root` commits to this payment set.
#[must_use]
pub fn verify_plan_root(
    group_id: GroupId,
    payments: &[SettlementPayment],
    expected_root: &[u8; 32],
) -> bool {
    compute_plan_root(group_id, payments) == *expected_root
}

/// Hex rendering for logs and wire payloads.
#[must_use]
pub fn plan_root_hex(root: &[u8; 32]) -> String {
    hex::encode(root)
}
