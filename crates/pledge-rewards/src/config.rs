use crate::error::{Result, RewardError};
use pledge_types::{MintAddress, RawAmount, WalletAddress};
use serde::{Deserialize, Serialize};

/// Hard cap on backfill pairs examined per request.
pub const MAX_BACKFILL_PAIRS: usize = 12;
/// Hard cap on distributions created per backfill request.
pub const MAX_BACKFILL_CREATIONS: usize = 5;
/// Accepted mint decimals range is 0..=MAX_MINT_DECIMALS inclusive.
pub const MAX_MINT_DECIMALS: u8 = 18;

/// How a milestone's reward pool is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMode {
    /// A fixed total pool per milestone, split pro-rata by stake weight.
    Pool,
    /// A fixed raw amount per vote, scaled by per-wallet multipliers; the
    /// pool is discovered as the sum of the individual amounts.
    PerVote,
}

/// Injected engine configuration. No ambient globals: every component
/// receives this struct explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Seconds after the window-start timestamp during which votes count.
    pub voting_cutoff_secs: u64,
    /// How many recent closed milestones feed the participation multiplier.
    pub participation_window: usize,
    /// Misses forgiven at the reduced penalty tier.
    pub grace_misses: u32,
    pub payout_mode: PayoutMode,
    /// Raw units paid per vote in `PerVote` mode.
    pub per_vote_amount: RawAmount,
    /// Raw units in the per-milestone pool in `Pool` mode.
    pub pool_amount: RawAmount,
    /// Upper bound on any distribution's pool, both modes.
    pub max_pool_amount: RawAmount,
    /// Mint the rewards are denominated in.
    pub mint_address: MintAddress,
    /// Funding authority that will later pay allocations.
    pub faucet_owner_address: WalletAddress,
    /// Recent (commitment, milestone) pairs examined per backfill request.
    pub backfill_pairs: usize,
    /// Successful creations allowed per backfill request.
    pub backfill_creations: usize,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            voting_cutoff_secs: 86_400,
            participation_window: 20,
            grace_misses: 2,
            payout_mode: PayoutMode::Pool,
            per_vote_amount: RawAmount::from_raw(1_000_000),
            pool_amount: RawAmount::from_raw(1_000_000_000),
            max_pool_amount: RawAmount::MAX,
            mint_address: MintAddress::new("So11111111111111111111111111111111111111112")
                .expect("default mint address is valid"),
            faucet_owner_address: WalletAddress::new("11111111111111111111111111111111")
                .expect("default faucet owner is valid"),
            backfill_pairs: 8,
            backfill_creations: 2,
        }
    }
}

impl RewardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.voting_cutoff_secs == 0 {
            return Err(RewardError::InvalidConfig(
                "voting_cutoff_secs must be positive".to_string(),
            ));
        }
        if self.participation_window == 0 {
            return Err(RewardError::InvalidConfig(
                "participation_window must be positive".to_string(),
            ));
        }
        match self.payout_mode {
            PayoutMode::PerVote if self.per_vote_amount.is_zero() => {
                return Err(RewardError::InvalidConfig(
                    "per_vote_amount must be positive in per-vote mode".to_string(),
                ));
            }
            PayoutMode::Pool if self.pool_amount.is_zero() => {
                return Err(RewardError::InvalidConfig(
                    "pool_amount must be positive in pool mode".to_string(),
                ));
            }
            PayoutMode::Pool if self.pool_amount > self.max_pool_amount => {
                return Err(RewardError::InvalidConfig(format!(
                    "pool_amount {} exceeds max_pool_amount {}",
                    self.pool_amount, self.max_pool_amount
                )));
            }
            _ => {}
        }
        if self.max_pool_amount.is_zero() {
            return Err(RewardError::InvalidConfig(
                "max_pool_amount must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured pair budget clamped to the hard cap.
    pub fn backfill_pair_limit(&self) -> usize {
        self.backfill_pairs.clamp(1, MAX_BACKFILL_PAIRS)
    }

    /// Configured creation budget clamped to the hard cap.
    pub fn backfill_creation_limit(&self) -> usize {
        self.backfill_creations.clamp(1, MAX_BACKFILL_CREATIONS)
    }
}
