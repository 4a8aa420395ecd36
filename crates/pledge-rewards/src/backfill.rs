use crate::error::Result;
use crate::settlement::{SettlementEngine, SettlementOutcome};
use pledge_types::WalletAddress;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one backfill sweep did. Pairs that were already settled or not yet
/// closed count as considered but never against the creation budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub pairs_considered: usize,
    pub distributions_created: usize,
}

/// Opportunistic settlement trigger. Nothing pushes settlement proactively,
/// so any request path that observes a participating wallet can run a sweep
/// over that wallet's recent (commitment, milestone) pairs under a bounded
/// work budget.
///
/// Best-effort by design: trouble with one pair is logged and the sweep
/// moves on. Redundant concurrent sweeps are safe — uniqueness is the
/// store's guarantee, not this driver's.
pub struct BackfillDriver {
    engine: Arc<SettlementEngine>,
}

impl BackfillDriver {
    pub fn new(engine: Arc<SettlementEngine>) -> Self {
        Self { engine }
    }

    pub async fn run(&self, wallet: &WalletAddress) -> Result<BackfillReport> {
        let pair_limit = self.engine.config().backfill_pair_limit();
        let creation_limit = self.engine.config().backfill_creation_limit();

        let pairs = self
            .engine
            .signal_source()
            .recent_pairs(wallet, pair_limit)
            .await?;

        let mut report = BackfillReport::default();
        for (commitment, milestone) in pairs {
            report.pairs_considered += 1;

            // Cheap existence probe before recomputing a full candidate
            match self.engine.distribution_store().get(&commitment, &milestone).await {
                Ok(Some(_)) => {
                    debug!(
                        commitment_id = %commitment,
                        milestone_id = %milestone,
                        "Pair already settled"
                    );
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        commitment_id = %commitment,
                        milestone_id = %milestone,
                        error = %e,
                        "Store probe failed; skipping pair"
                    );
                    continue;
                }
            }

            match self.engine.settle(&commitment, &milestone).await {
                Ok(SettlementOutcome::Created { distribution, .. }) => {
                    report.distributions_created += 1;
                    info!(
                        wallet = %wallet,
                        distribution_id = %distribution.id,
                        created = report.distributions_created,
                        limit = creation_limit,
                        "Backfill created distribution"
                    );
                    if report.distributions_created >= creation_limit {
                        break;
                    }
                }
                Ok(outcome) => {
                    debug!(
                        commitment_id = %commitment,
                        milestone_id = %milestone,
                        ?outcome,
                        "Backfill pair produced no distribution"
                    );
                }
                Err(e) => {
                    warn!(
                        commitment_id = %commitment,
                        milestone_id = %milestone,
                        error = %e,
                        "Backfill settlement failed; continuing"
                    );
                }
            }
        }

        info!(
            wallet = %wallet,
            pairs_considered = report.pairs_considered,
            distributions_created = report.distributions_created,
            "🔄 Backfill sweep finished"
        );
        Ok(report)
    }
}
