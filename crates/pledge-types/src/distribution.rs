use crate::address::{CommitmentId, MilestoneId, MintAddress, WalletAddress};
use crate::amount::RawAmount;
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque distribution identifier, derived once at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistributionId(String);

impl DistributionId {
    pub fn derive(commitment: &CommitmentId, milestone: &MilestoneId, created_at_unix: i64) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(commitment.as_str().as_bytes());
        hasher.update(milestone.as_str().as_bytes());
        hasher.update(&created_at_unix.to_le_bytes());
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DistributionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Distribution lifecycle. This subsystem only ever writes `Open`; funding
/// and claim execution move it onward elsewhere without touching amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    Open,
    Funded,
    Closed,
}

/// The settlement record for exactly one (commitment, milestone) pair.
///
/// At most one exists per pair, ever. `mint_address`,
/// `token_program_address`, `pool_amount` and `faucet_owner_address` are
/// immutable once the row is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: DistributionId,
    pub commitment_id: CommitmentId,
    pub milestone_id: MilestoneId,
    pub created_at_unix: i64,
    pub mint_address: MintAddress,
    pub token_program_address: String,
    pub decimals: u8,
    pub pool_amount: RawAmount,
    pub faucet_owner_address: WalletAddress,
    pub status: DistributionStatus,
}

/// One wallet's share of a distribution. The sum of a distribution's
/// allocation amounts equals its pool amount exactly; `weight` is retained
/// for audit only and is never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub distribution_id: DistributionId,
    pub wallet: WalletAddress,
    pub amount: RawAmount,
    pub weight: f64,
}
