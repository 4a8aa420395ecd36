use crate::allocation::{compute_per_vote, compute_pool, ComputedAllocations};
use crate::config::{PayoutMode, RewardConfig, MAX_MINT_DECIMALS};
use crate::error::{Result, RewardError};
use crate::participation::ParticipationCalculator;
use crate::sources::{ChainFacts, SignalSource};
use crate::store::{DistributionStore, InsertOutcome};
use crate::window::resolve_window;
use pledge_types::{
    Allocation, CommitmentId, Distribution, DistributionId, DistributionStatus, Milestone,
    MilestoneId, RawAmount, WalletAddress,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a settlement attempt created nothing. All of these are normal
/// outcomes; none aborts a backfill batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Market-cap-automated milestones never pay voting rewards.
    AutomatedMilestone,
    /// The milestone has no resolvable window (not completed, or degenerate).
    NoWindow,
    /// The window has not closed yet.
    WindowNotClosed,
    /// Nobody signaled on the milestone.
    NoSignals,
    /// Every signal was excluded or total weight came out non-positive.
    NoEligibleWeight,
    /// The computed pool was zero.
    ZeroPool,
    /// The computed pool exceeded the configured cap.
    PoolCapExceeded,
    /// Arithmetic left the safe unsigned range; fail closed.
    AmountOverflow,
}

/// Outcome of one settlement attempt for a (commitment, milestone) pair.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// This caller won the race and created the distribution.
    Created {
        distribution: Distribution,
        allocations: Vec<Allocation>,
    },
    /// A distribution already existed with identical terms.
    AlreadySettled { distribution: Distribution },
    /// A distribution already existed with DIFFERENT terms — configuration
    /// drifted since the original creation. The stored row is left
    /// untouched; this needs human review, not a retry.
    Conflict {
        existing: Distribution,
        candidate_pool: RawAmount,
    },
    /// No distribution was created; see the reason.
    Skipped(SkipReason),
}

/// Orchestrates one race-safe settlement attempt: window resolution,
/// eligibility, multipliers, amounts, and the atomic create-or-confirm
/// against the durable store.
///
/// Attempts are side-effect-free until the store's conditional insert, so a
/// caller may wrap `settle` in a timeout without risking partial state, and
/// any number of callers may race on the same pair.
pub struct SettlementEngine {
    signals: Arc<dyn SignalSource>,
    chain: Arc<dyn ChainFacts>,
    store: Arc<dyn DistributionStore>,
    config: RewardConfig,
}

impl SettlementEngine {
    pub fn new(
        signals: Arc<dyn SignalSource>,
        chain: Arc<dyn ChainFacts>,
        store: Arc<dyn DistributionStore>,
        config: RewardConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            signals,
            chain,
            store,
            config,
        })
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    pub(crate) fn signal_source(&self) -> &Arc<dyn SignalSource> {
        &self.signals
    }

    pub(crate) fn distribution_store(&self) -> &Arc<dyn DistributionStore> {
        &self.store
    }

    /// Settle one (commitment, milestone) pair.
    ///
    /// Idempotent and race-safe: the first caller to observe the closed
    /// window creates the distribution, everyone else observes the stored
    /// result. Never mutates an existing distribution.
    pub async fn settle(
        &self,
        commitment: &CommitmentId,
        milestone_id: &MilestoneId,
    ) -> Result<SettlementOutcome> {
        let milestones = self.signals.milestones(commitment).await?;
        let milestone = milestones
            .iter()
            .find(|m| &m.id == milestone_id)
            .ok_or_else(|| RewardError::MilestoneNotFound(milestone_id.to_string()))?;

        if milestone.kind.is_automated() {
            return Ok(SettlementOutcome::Skipped(SkipReason::AutomatedMilestone));
        }

        let Some(window) = resolve_window(milestone, self.config.voting_cutoff_secs) else {
            return Ok(SettlementOutcome::Skipped(SkipReason::NoWindow));
        };

        let now = self.chain.current_time().await?;
        if !window.is_closed(now) {
            debug!(
                commitment_id = %commitment,
                milestone_id = %milestone_id,
                window_end = window.end_unix,
                now,
                "Window still open"
            );
            return Ok(SettlementOutcome::Skipped(SkipReason::WindowNotClosed));
        }

        let computed = match self
            .compute_candidate(commitment, milestone, &milestones, now)
            .await?
        {
            Ok(computed) => computed,
            Err(reason) => {
                debug!(
                    commitment_id = %commitment,
                    milestone_id = %milestone_id,
                    ?reason,
                    "Settlement skipped"
                );
                return Ok(SettlementOutcome::Skipped(reason));
            }
        };

        let facts = self
            .chain
            .mint_facts(&self.config.mint_address)
            .await?
            .ok_or_else(|| RewardError::MintNotFound(self.config.mint_address.to_string()))?;
        if facts.decimals > MAX_MINT_DECIMALS {
            return Err(RewardError::DecimalsOutOfRange {
                decimals: facts.decimals,
                max: MAX_MINT_DECIMALS,
            });
        }

        let id = DistributionId::derive(commitment, milestone_id, now);
        let distribution = Distribution {
            id: id.clone(),
            commitment_id: commitment.clone(),
            milestone_id: milestone_id.clone(),
            created_at_unix: now,
            mint_address: self.config.mint_address.clone(),
            token_program_address: facts.token_program,
            decimals: facts.decimals,
            pool_amount: computed.pool_amount,
            faucet_owner_address: self.config.faucet_owner_address.clone(),
            status: DistributionStatus::Open,
        };
        let allocations: Vec<Allocation> = computed
            .entries
            .iter()
            .map(|entry| Allocation {
                distribution_id: id.clone(),
                wallet: entry.wallet.clone(),
                amount: entry.amount,
                weight: entry.weight,
            })
            .collect();

        match self
            .store
            .try_insert(distribution.clone(), allocations.clone())
            .await?
        {
            InsertOutcome::Created => {
                info!(
                    distribution_id = %distribution.id,
                    commitment_id = %commitment,
                    milestone_id = %milestone_id,
                    pool_amount = %distribution.pool_amount,
                    pool_ui = distribution.pool_amount.to_ui(distribution.decimals),
                    allocation_count = allocations.len(),
                    "🏆 Distribution created"
                );
                Ok(SettlementOutcome::Created {
                    distribution,
                    allocations,
                })
            }
            InsertOutcome::Existing(existing) => {
                if Self::terms_match(&existing, &distribution) {
                    debug!(
                        distribution_id = %existing.id,
                        commitment_id = %commitment,
                        milestone_id = %milestone_id,
                        "Distribution already settled consistently"
                    );
                    Ok(SettlementOutcome::AlreadySettled {
                        distribution: existing,
                    })
                } else {
                    warn!(
                        distribution_id = %existing.id,
                        commitment_id = %commitment,
                        milestone_id = %milestone_id,
                        stored_pool = %existing.pool_amount,
                        candidate_pool = %distribution.pool_amount,
                        "⚠️ Distribution terms conflict; stored row left untouched"
                    );
                    Ok(SettlementOutcome::Conflict {
                        existing,
                        candidate_pool: distribution.pool_amount,
                    })
                }
            }
        }
    }

    /// Terms that must never drift between the stored row and a candidate.
    /// Pool amounts are compared as raw integers, never as floats.
    fn terms_match(existing: &Distribution, candidate: &Distribution) -> bool {
        existing.mint_address == candidate.mint_address
            && existing.token_program_address == candidate.token_program_address
            && existing.pool_amount == candidate.pool_amount
            && existing.faucet_owner_address == candidate.faucet_owner_address
    }

    async fn compute_candidate(
        &self,
        commitment: &CommitmentId,
        milestone: &Milestone,
        milestones: &[Milestone],
        now: i64,
    ) -> Result<std::result::Result<ComputedAllocations, SkipReason>> {
        let signals = self.signals.signals(commitment, &milestone.id).await?;
        if signals.is_empty() {
            return Ok(Err(SkipReason::NoSignals));
        }

        let mut wallets: Vec<WalletAddress> =
            signals.iter().map(|s| s.wallet.clone()).collect();
        wallets.sort();
        wallets.dedup();

        let multipliers = ParticipationCalculator::new(&self.config)
            .multipliers(self.signals.as_ref(), commitment, milestones, &wallets, now)
            .await?;

        Ok(match self.config.payout_mode {
            PayoutMode::PerVote => compute_per_vote(
                &signals,
                &multipliers,
                self.config.per_vote_amount,
                self.config.max_pool_amount,
            ),
            PayoutMode::Pool => compute_pool(&signals, &multipliers, self.config.pool_amount),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FixedChainFacts, MemorySignalSource, MintFacts};
    use crate::store::MemoryDistributionStore;
    use pledge_types::{MilestoneKind, MintAddress, VoteSignal};

    const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

    fn wallet(tag: char) -> WalletAddress {
        WalletAddress::new(format!("{}111111111111111111111111111111w", tag)).unwrap()
    }

    async fn engine_parts(
        config: RewardConfig,
        now: i64,
    ) -> (
        Arc<MemorySignalSource>,
        Arc<FixedChainFacts>,
        Arc<MemoryDistributionStore>,
        SettlementEngine,
    ) {
        let signals = Arc::new(MemorySignalSource::new());
        let chain = Arc::new(FixedChainFacts::new(now));
        chain
            .insert_mint(
                config.mint_address.clone(),
                MintFacts {
                    decimals: 0,
                    token_program: TOKEN_PROGRAM.to_string(),
                },
            )
            .await;
        let store = Arc::new(MemoryDistributionStore::new());
        let engine = SettlementEngine::new(
            signals.clone(),
            chain.clone(),
            store.clone(),
            config,
        )
        .unwrap();
        (signals, chain, store, engine)
    }

    fn standard_milestone(id: &str, completed_at: i64) -> Milestone {
        Milestone {
            id: MilestoneId::new(id).unwrap(),
            commitment_id: CommitmentId::new("cmt_1").unwrap(),
            kind: MilestoneKind::Standard,
            completed_at: Some(completed_at),
            review_opened_at: None,
            due_at: None,
        }
    }

    fn vote(milestone_id: &str, wallet: &WalletAddress, base: u64, created_at: i64) -> VoteSignal {
        VoteSignal {
            commitment_id: CommitmentId::new("cmt_1").unwrap(),
            milestone_id: MilestoneId::new(milestone_id).unwrap(),
            wallet: wallet.clone(),
            base_weighted_amount: RawAmount::from_raw(base),
            ship_multiplier_bps: Some(10_000),
            created_at,
        }
    }

    fn fixed_mode_config() -> RewardConfig {
        RewardConfig {
            payout_mode: PayoutMode::PerVote,
            per_vote_amount: RawAmount::from_raw(1_000),
            voting_cutoff_secs: 86_400,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_settle_creates_open_distribution() {
        let config = fixed_mode_config();
        let (signals, _chain, store, engine) = engine_parts(config, 200_000).await;
        let commitment = CommitmentId::new("cmt_1").unwrap();
        let milestone_id = MilestoneId::new("ms_1").unwrap();

        signals.add_milestone(standard_milestone("ms_1", 1_000)).await;
        signals.add_signal(vote("ms_1", &wallet('a'), 0, 1_100)).await;

        let outcome = engine.settle(&commitment, &milestone_id).await.unwrap();
        match outcome {
            SettlementOutcome::Created {
                distribution,
                allocations,
            } => {
                assert_eq!(distribution.status, DistributionStatus::Open);
                assert_eq!(distribution.pool_amount, RawAmount::from_raw(2_000));
                assert_eq!(distribution.token_program_address, TOKEN_PROGRAM);
                assert_eq!(allocations.len(), 1);
                assert_eq!(allocations[0].amount, RawAmount::from_raw(2_000));
            }
            other => panic!("expected Created, got {:?}", other),
        }
        assert_eq!(store.distribution_count().await, 1);
    }

    #[tokio::test]
    async fn test_open_window_is_skipped() {
        let config = fixed_mode_config();
        // now is one second before the window end (1_000 + 86_400)
        let (signals, _chain, _store, engine) = engine_parts(config, 87_399).await;
        let commitment = CommitmentId::new("cmt_1").unwrap();
        let milestone_id = MilestoneId::new("ms_1").unwrap();

        signals.add_milestone(standard_milestone("ms_1", 1_000)).await;
        signals.add_signal(vote("ms_1", &wallet('a'), 0, 1_100)).await;

        let outcome = engine.settle(&commitment, &milestone_id).await.unwrap();
        assert!(matches!(
            outcome,
            SettlementOutcome::Skipped(SkipReason::WindowNotClosed)
        ));
    }

    #[tokio::test]
    async fn test_window_closing_exactly_now_settles() {
        let config = fixed_mode_config();
        let (signals, _chain, _store, engine) = engine_parts(config, 87_400).await;
        let commitment = CommitmentId::new("cmt_1").unwrap();
        let milestone_id = MilestoneId::new("ms_1").unwrap();

        signals.add_milestone(standard_milestone("ms_1", 1_000)).await;
        signals.add_signal(vote("ms_1", &wallet('a'), 0, 1_100)).await;

        let outcome = engine.settle(&commitment, &milestone_id).await.unwrap();
        assert!(matches!(outcome, SettlementOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn test_automated_milestone_never_settles() {
        let config = fixed_mode_config();
        let (signals, _chain, store, engine) = engine_parts(config, 200_000).await;
        let commitment = CommitmentId::new("cmt_1").unwrap();
        let milestone_id = MilestoneId::new("ms_auto").unwrap();

        let mut milestone = standard_milestone("ms_auto", 1_000);
        milestone.kind = MilestoneKind::MarketCapAuto;
        signals.add_milestone(milestone).await;
        signals.add_signal(vote("ms_auto", &wallet('a'), 0, 1_100)).await;

        let outcome = engine.settle(&commitment, &milestone_id).await.unwrap();
        assert!(matches!(
            outcome,
            SettlementOutcome::Skipped(SkipReason::AutomatedMilestone)
        ));
        assert_eq!(store.distribution_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_mint_is_configuration_error() {
        let config = RewardConfig {
            mint_address: MintAddress::new("Fm9rHUTF5v3hwMLbStjZXqNBBoZyGriQaFM6sTFz3K8A")
                .unwrap(),
            ..fixed_mode_config()
        };
        let signals = Arc::new(MemorySignalSource::new());
        let chain = Arc::new(FixedChainFacts::new(200_000));
        let store = Arc::new(MemoryDistributionStore::new());
        let engine =
            SettlementEngine::new(signals.clone(), chain, store, config).unwrap();

        let commitment = CommitmentId::new("cmt_1").unwrap();
        let milestone_id = MilestoneId::new("ms_1").unwrap();
        signals.add_milestone(standard_milestone("ms_1", 1_000)).await;
        signals.add_signal(vote("ms_1", &wallet('a'), 0, 1_100)).await;

        let result = engine.settle(&commitment, &milestone_id).await;
        assert!(matches!(result, Err(RewardError::MintNotFound(_))));
    }
}
