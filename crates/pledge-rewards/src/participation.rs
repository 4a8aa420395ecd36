use crate::config::RewardConfig;
use crate::error::Result;
use crate::sources::SignalSource;
use crate::window::resolve_window;
use pledge_types::{CommitmentId, Milestone, MilestoneId, WalletAddress};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const MAX_MULTIPLIER: f64 = 2.0;
const MIN_MULTIPLIER: f64 = 0.5;
const GRACE_MISS_PENALTY: f64 = 0.05;
const MISS_PENALTY: f64 = 0.10;

/// Computes per-wallet streak multipliers from how consistently each wallet
/// voted across the recent closed milestones of a commitment.
///
/// Multipliers are transient: every settlement attempt recomputes them from
/// read-only history, so concurrent racers always agree.
pub struct ParticipationCalculator {
    window_size: usize,
    grace_misses: u32,
    cutoff_secs: u64,
}

impl ParticipationCalculator {
    pub fn new(config: &RewardConfig) -> Self {
        Self {
            window_size: config.participation_window,
            grace_misses: config.grace_misses,
            cutoff_secs: config.voting_cutoff_secs,
        }
    }

    /// Penalty tiers applied to missed voting opportunities: the first
    /// `grace` misses cost 0.05 each, the rest 0.10 each, and the result is
    /// clamped into [0.5, 2.0].
    pub fn multiplier_from_misses(misses: u32, grace: u32) -> f64 {
        let graced = misses.min(grace) as f64;
        let beyond = misses.saturating_sub(grace) as f64;
        let penalty = graced * GRACE_MISS_PENALTY + beyond * MISS_PENALTY;
        (MAX_MULTIPLIER - penalty).clamp(MIN_MULTIPLIER, MAX_MULTIPLIER)
    }

    /// The most recent closed milestones of the commitment, newest close
    /// first, deduplicated, at most `window_size`. Automated milestones
    /// carry no holder vote and are not counted as opportunities.
    pub fn recent_closed_windows(
        &self,
        milestones: &[Milestone],
        now: i64,
    ) -> Vec<(MilestoneId, i64)> {
        let mut closed: Vec<(MilestoneId, i64)> = Vec::new();
        let mut seen: HashSet<MilestoneId> = HashSet::new();

        for milestone in milestones {
            if milestone.kind.is_automated() || !seen.insert(milestone.id.clone()) {
                continue;
            }
            if let Some(window) = resolve_window(milestone, self.cutoff_secs) {
                if window.is_closed(now) {
                    closed.push((milestone.id.clone(), window.end_unix));
                }
            }
        }

        closed.sort_by(|a, b| b.1.cmp(&a.1));
        closed.truncate(self.window_size);
        closed
    }

    /// Per-wallet multipliers for one settlement attempt.
    pub async fn multipliers(
        &self,
        source: &dyn SignalSource,
        commitment: &CommitmentId,
        milestones: &[Milestone],
        wallets: &[WalletAddress],
        now: i64,
    ) -> Result<HashMap<WalletAddress, f64>> {
        let recent = self.recent_closed_windows(milestones, now);
        if recent.is_empty() || wallets.is_empty() {
            return Ok(wallets
                .iter()
                .map(|w| (w.clone(), MAX_MULTIPLIER))
                .collect());
        }

        let recent_ids: Vec<MilestoneId> = recent.iter().map(|(id, _)| id.clone()).collect();
        let counts = source.signal_counts(commitment, wallets, &recent_ids).await?;
        let first_seen = source.first_signal_times(commitment, wallets).await?;

        let mut multipliers = HashMap::with_capacity(wallets.len());
        for wallet in wallets {
            // A wallet is only on the hook for windows that closed after it
            // first showed up on this commitment.
            let opportunities = match first_seen.get(wallet) {
                Some(first) => recent.iter().filter(|(_, close)| close >= first).count(),
                None => recent.len(),
            } as u32;

            let votes = counts.get(wallet).copied().unwrap_or(0);
            let misses = opportunities.saturating_sub(votes);
            let multiplier = Self::multiplier_from_misses(misses, self.grace_misses);

            debug!(
                wallet = %wallet,
                opportunities,
                votes,
                misses,
                multiplier,
                "Participation multiplier computed"
            );
            multipliers.insert(wallet.clone(), multiplier);
        }

        Ok(multipliers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySignalSource;
    use pledge_types::{MilestoneKind, RawAmount, VoteSignal};

    fn calculator(window_size: usize, grace: u32) -> ParticipationCalculator {
        ParticipationCalculator::new(&RewardConfig {
            participation_window: window_size,
            grace_misses: grace,
            voting_cutoff_secs: 100,
            ..Default::default()
        })
    }

    fn milestone(id: &str, completed_at: i64, kind: MilestoneKind) -> Milestone {
        Milestone {
            id: MilestoneId::new(id).unwrap(),
            commitment_id: CommitmentId::new("cmt_1").unwrap(),
            kind,
            completed_at: Some(completed_at),
            review_opened_at: None,
            due_at: None,
        }
    }

    fn wallet(tag: char) -> WalletAddress {
        WalletAddress::new(format!("{}111111111111111111111111111111w", tag)).unwrap()
    }

    fn signal(milestone_id: &str, wallet: &WalletAddress, created_at: i64) -> VoteSignal {
        VoteSignal {
            commitment_id: CommitmentId::new("cmt_1").unwrap(),
            milestone_id: MilestoneId::new(milestone_id).unwrap(),
            wallet: wallet.clone(),
            base_weighted_amount: RawAmount::from_raw(1_000),
            ship_multiplier_bps: Some(10_000),
            created_at,
        }
    }

    #[test]
    fn test_miss_penalty_tiers() {
        // Grace of 2: first two misses cost 0.05, the rest 0.10
        assert_eq!(ParticipationCalculator::multiplier_from_misses(0, 2), 2.0);
        assert_eq!(ParticipationCalculator::multiplier_from_misses(1, 2), 1.95);
        assert_eq!(ParticipationCalculator::multiplier_from_misses(2, 2), 1.9);
        assert_eq!(ParticipationCalculator::multiplier_from_misses(3, 2), 1.8);
        assert_eq!(ParticipationCalculator::multiplier_from_misses(4, 2), 1.7);
    }

    #[test]
    fn test_multiplier_bounds() {
        for misses in 0..200 {
            for grace in 0..20 {
                let m = ParticipationCalculator::multiplier_from_misses(misses, grace);
                assert!((0.5..=2.0).contains(&m), "misses={misses} grace={grace}");
            }
        }
        assert_eq!(ParticipationCalculator::multiplier_from_misses(100, 2), 0.5);
    }

    #[test]
    fn test_recent_windows_sorted_and_bounded() {
        let calc = calculator(2, 2);
        let milestones = vec![
            milestone("ms_1", 1_000, MilestoneKind::Standard),
            milestone("ms_2", 3_000, MilestoneKind::Standard),
            milestone("ms_3", 2_000, MilestoneKind::Standard),
            milestone("ms_auto", 4_000, MilestoneKind::MarketCapAuto),
            milestone("ms_open", 9_000, MilestoneKind::Standard),
        ];

        // Windows close at completed_at + 100; now = 5_000 leaves ms_open open
        let recent = calc.recent_closed_windows(&milestones, 5_000);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].0.as_str(), "ms_2");
        assert_eq!(recent[1].0.as_str(), "ms_3");
    }

    #[tokio::test]
    async fn test_consistent_voter_keeps_maximum() {
        let source = MemorySignalSource::new();
        let commitment = CommitmentId::new("cmt_1").unwrap();
        let voter = wallet('a');

        for (id, completed) in [("ms_1", 1_000), ("ms_2", 2_000), ("ms_3", 3_000)] {
            source
                .add_milestone(milestone(id, completed, MilestoneKind::Standard))
                .await;
            source.add_signal(signal(id, &voter, completed + 10)).await;
        }

        let calc = calculator(20, 2);
        let milestones = source.milestones(&commitment).await.unwrap();
        let multipliers = calc
            .multipliers(&source, &commitment, &milestones, &[voter.clone()], 10_000)
            .await
            .unwrap();

        assert_eq!(multipliers[&voter], 2.0);
    }

    #[tokio::test]
    async fn test_late_joiner_not_penalized_for_old_windows() {
        let source = MemorySignalSource::new();
        let commitment = CommitmentId::new("cmt_1").unwrap();
        let veteran = wallet('a');
        let newcomer = wallet('b');

        for (id, completed) in [("ms_1", 1_000), ("ms_2", 2_000), ("ms_3", 3_000)] {
            source
                .add_milestone(milestone(id, completed, MilestoneKind::Standard))
                .await;
            source.add_signal(signal(id, &veteran, completed + 10)).await;
        }
        // Newcomer's first signal lands after ms_1 and ms_2 closed
        source.add_signal(signal("ms_3", &newcomer, 3_010)).await;

        let calc = calculator(20, 0);
        let milestones = source.milestones(&commitment).await.unwrap();
        let multipliers = calc
            .multipliers(
                &source,
                &commitment,
                &milestones,
                &[veteran.clone(), newcomer.clone()],
                10_000,
            )
            .await
            .unwrap();

        // Only ms_3's window (closing 3_100) postdates the newcomer's first
        // signal, and they voted on it: no misses for either wallet.
        assert_eq!(multipliers[&newcomer], 2.0);
        assert_eq!(multipliers[&veteran], 2.0);
    }

    #[tokio::test]
    async fn test_silent_wallet_is_penalized() {
        let source = MemorySignalSource::new();
        let commitment = CommitmentId::new("cmt_1").unwrap();
        let voter = wallet('a');

        for (id, completed) in [("ms_1", 1_000), ("ms_2", 2_000), ("ms_3", 3_000)] {
            source
                .add_milestone(milestone(id, completed, MilestoneKind::Standard))
                .await;
        }
        // Voted only on the first milestone; signal time predates all closes
        source.add_signal(signal("ms_1", &voter, 1_010)).await;

        let calc = calculator(20, 2);
        let milestones = source.milestones(&commitment).await.unwrap();
        let multipliers = calc
            .multipliers(&source, &commitment, &milestones, &[voter.clone()], 10_000)
            .await
            .unwrap();

        // 3 opportunities, 1 vote: 2 misses, both within grace
        assert_eq!(multipliers[&voter], 1.9);
    }
}
