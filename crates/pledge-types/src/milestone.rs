use crate::address::{CommitmentId, MilestoneId, WalletAddress};
use crate::amount::RawAmount;
use serde::{Deserialize, Serialize};

/// How a milestone is completed. Market-cap milestones complete automatically
/// from chain data and carry no holder vote, so they never pay voting rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Standard,
    MarketCapAuto,
}

impl MilestoneKind {
    pub fn is_automated(&self) -> bool {
        matches!(self, Self::MarketCapAuto)
    }
}

/// Read-only view of an escrow milestone. Owned by the commitment store;
/// this subsystem never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub commitment_id: CommitmentId,
    pub kind: MilestoneKind,
    pub completed_at: Option<i64>,
    pub review_opened_at: Option<i64>,
    pub due_at: Option<i64>,
}

/// A wallet's recorded vote-weight inputs for one milestone. At most one per
/// (commitment, milestone, wallet); first-seen time for a wallet is the
/// minimum `created_at` across its signals on a commitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteSignal {
    pub commitment_id: CommitmentId,
    pub milestone_id: MilestoneId,
    pub wallet: WalletAddress,
    pub base_weighted_amount: RawAmount,
    pub ship_multiplier_bps: Option<i64>,
    pub created_at: i64,
}

/// The time range during which a milestone's votes count toward settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteWindow {
    pub start_unix: i64,
    pub end_unix: i64,
}

impl VoteWindow {
    /// A window ending exactly at `now` is closed.
    pub fn is_closed(&self, now: i64) -> bool {
        self.end_unix <= now
    }
}
