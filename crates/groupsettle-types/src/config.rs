//! Configuration for the settlement engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{GroupSettleError, Result, constants};

/// How debtors and creditors are ordered before greedy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NettingOrder {
    /// Member order as supplied. Deterministic for a fixed input order.
    #[default]
    InputOrder,
    /// Sorted by address. Stable across re-runs and re-orderings.
    ByAddress,
    /// Largest outstanding magnitude first, ties broken by address.
    LargestFirst,
}

/// How signature events count toward the quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerPolicy {
    /// Each member is credited at most once.
    #[default]
    DistinctSigners,
    /// Every signature event counts, regardless of who signed.
    CounterOnly,
}

/// Engine configuration. One value per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Authorizations required before a proposal may be broadcast.
    pub required_signatures: u32,
    /// Period of the background balance refresh.
    pub refresh_interval_ms: u64,
    pub netting_order: NettingOrder,
    pub signer_policy: SignerPolicy,
    /// Residual treated as zero by the netting algorithm.
    pub amount_epsilon: Decimal,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            required_signatures: constants::DEFAULT_REQUIRED_SIGNATURES,
            refresh_interval_ms: constants::DEFAULT_REFRESH_INTERVAL_MS,
            netting_order: NettingOrder::default(),
            signer_policy: SignerPolicy::default(),
            amount_epsilon: constants::NETTING_EPSILON,
        }
    }
}

impl SettlementConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.required_signatures == 0 {
            return Err(GroupSettleError::Configuration(
                "required_signatures must be at least 1".into(),
            ));
        }
        if self.refresh_interval_ms == 0 {
            return Err(GroupSettleError::Configuration(
                "refresh_interval_ms must be positive".into(),
            ));
        }
        if self.amount_epsilon.is_sign_negative() {
            return Err(GroupSettleError::Configuration(
                "amount_epsilon must not be negative".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.refresh_interval_ms)
    }
}
