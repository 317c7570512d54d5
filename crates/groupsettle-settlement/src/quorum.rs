//! Signature quorum tracking.
//!
//! Two counting policies:
//!
//! - **DistinctSigners**: a set of credited addresses. A member counts once;
//!   a second signature from the same member is refused.
//! - **CounterOnly**: every signature event counts, whoever signed. One
//!   member can satisfy the quorum alone. Kept for parity with deployments
//!   that only track a count.
//!
//! In both modes `collected` never decreases and never exceeds `required`.

use std::collections::BTreeSet;

use groupsettle_types::{GroupSettleError, MemberAddress, Result, SignerPolicy};
use serde::{Deserialize, Serialize};

/// Authorization count toward a fixed requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum {
    required: u32,
    collected: u32,
    policy: SignerPolicy,
    signers: BTreeSet<MemberAddress>,
}

impl Quorum {
    /// A fresh quorum with nothing collected.
    ///
    /// # Errors
    /// Returns [`GroupSettleError::Configuration`] if `required` is zero.
    pub fn new(required: u32, policy: SignerPolicy) -> Result<Self> {
        if required == 0 {
            return Err(GroupSettleError::Configuration(
                "a quorum needs at least one signature".into(),
            ));
        }
        Ok(Self {
            required,
            collected: 0,
            policy,
            signers: BTreeSet::new(),
        })
    }

    /// Rebuild from remote state, clamping the count into range.
    ///
    /// Under `DistinctSigners` the count is never below the number of
    /// credited addresses.
    #[must_use]
    pub fn restore(
        required: u32,
        collected: u32,
        policy: SignerPolicy,
        signers: impl IntoIterator<Item = MemberAddress>,
    ) -> Self {
        let required = required.max(1);
        let signers: BTreeSet<MemberAddress> = signers.into_iter().collect();
        let mut collected = collected;
        if policy == SignerPolicy::DistinctSigners {
            collected = collected.max(u32::try_from(signers.len()).unwrap_or(u32::MAX));
        }
        Self {
            required,
            collected: collected.min(required),
            policy,
            signers,
        }
    }

    #[must_use]
    pub fn required(&self) -> u32 {
        self.required
    }

    #[must_use]
    pub fn collected(&self) -> u32 {
        self.collected
    }

    #[must_use]
    pub fn policy(&self) -> SignerPolicy {
        self.policy
    }

    /// Addresses credited so far (both policies record them).
    #[must_use]
    pub fn signers(&self) -> &BTreeSet<MemberAddress> {
        &self.signers
    }

    #[must_use]
    pub fn has_signed(&self, signer: &MemberAddress) -> bool {
        self.signers.contains(signer)
    }

    #[must_use]
    pub fn is_met(&self) -> bool {
        self.collected >= self.required
    }

    /// Whether `signer` may add a signature under the current policy.
    ///
    /// # Errors
    /// Returns [`GroupSettleError::DuplicateSigner`] if the policy counts
    /// distinct signers and `signer` is already credited.
    pub fn check(&self, signer: &MemberAddress) -> Result<()> {
        if self.policy == SignerPolicy::DistinctSigners && self.has_signed(signer) {
            return Err(GroupSettleError::DuplicateSigner(signer.clone()));
        }
        Ok(())
    }

    /// Credit one signature from `signer`, clamped to the requirement.
    pub fn credit(&mut self, signer: &MemberAddress) -> Result<()> {
        self.check(signer)?;
        self.signers.insert(signer.clone());
        self.collected = self.collected.saturating_add(1).min(self.required);
        Ok(())
    }

    /// Fold in another replica's view of the same quorum.
    ///
    /// Signer sets are unioned and the count takes the larger side, so
    /// nothing already credited is lost. Returns whether anything changed.
    pub fn absorb(
        &mut self,
        collected: u32,
        signers: impl IntoIterator<Item = MemberAddress>,
    ) -> bool {
        let before = (self.collected, self.signers.len());
        self.signers.extend(signers);

        let mut merged = self.collected.max(collected);
        if self.policy == SignerPolicy::DistinctSigners {
            merged = merged.max(u32::try_from(self.signers.len()).unwrap_or(u32::MAX));
        }
        self.collected = merged.min(self.required);

        before != (self.collected, self.signers.len())
    }
}
