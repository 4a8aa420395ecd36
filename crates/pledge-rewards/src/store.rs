use crate::error::Result;
use async_trait::async_trait;
use pledge_types::{Allocation, CommitmentId, Distribution, DistributionId, MilestoneId};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Result of the conditional insert.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// This caller won the race; the candidate row and its allocations are
    /// now durable.
    Created,
    /// A row already existed for the pair; the candidate was discarded and
    /// the stored row is returned for comparison.
    Existing(Distribution),
}

/// Durable store for distributions and their allocations.
///
/// `try_insert` is the only serialization point between concurrent
/// settlement attempts: it must be a single atomic conditional write keyed
/// by (commitment, milestone) — never read-then-write with a gap — and the
/// allocation writes must be part of the same atomic unit, so a crash or
/// timeout can never leave a distribution without its allocations. A
/// relational implementation uses a unique constraint on the pair and one
/// transaction around both inserts.
#[async_trait]
pub trait DistributionStore: Send + Sync {
    /// Insert the distribution and its allocations if no row exists for
    /// (commitment, milestone). Existing rows are never mutated.
    async fn try_insert(
        &self,
        distribution: Distribution,
        allocations: Vec<Allocation>,
    ) -> Result<InsertOutcome>;

    /// The stored distribution for a pair, if any.
    async fn get(
        &self,
        commitment: &CommitmentId,
        milestone: &MilestoneId,
    ) -> Result<Option<Distribution>>;

    /// Allocations of a stored distribution.
    async fn allocations(&self, id: &DistributionId) -> Result<Vec<Allocation>>;
}

/// In-memory store for tests and development. One lock guards both maps, so
/// the insert-if-absent plus allocation writes are indivisible.
#[derive(Default)]
pub struct MemoryDistributionStore {
    inner: RwLock<MemoryRows>,
}

#[derive(Default)]
struct MemoryRows {
    by_pair: HashMap<(CommitmentId, MilestoneId), Distribution>,
    allocations: HashMap<DistributionId, Vec<Allocation>>,
}

impl MemoryDistributionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn distribution_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.by_pair.len()
    }
}

#[async_trait]
impl DistributionStore for MemoryDistributionStore {
    async fn try_insert(
        &self,
        distribution: Distribution,
        allocations: Vec<Allocation>,
    ) -> Result<InsertOutcome> {
        let mut inner = self.inner.write().await;
        let key = (
            distribution.commitment_id.clone(),
            distribution.milestone_id.clone(),
        );

        if let Some(existing) = inner.by_pair.get(&key) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        info!(
            distribution_id = %distribution.id,
            commitment_id = %distribution.commitment_id,
            milestone_id = %distribution.milestone_id,
            pool_amount = %distribution.pool_amount,
            allocation_count = allocations.len(),
            "💾 Distribution stored"
        );

        inner
            .allocations
            .insert(distribution.id.clone(), allocations);
        inner.by_pair.insert(key, distribution);
        Ok(InsertOutcome::Created)
    }

    async fn get(
        &self,
        commitment: &CommitmentId,
        milestone: &MilestoneId,
    ) -> Result<Option<Distribution>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_pair
            .get(&(commitment.clone(), milestone.clone()))
            .cloned())
    }

    async fn allocations(&self, id: &DistributionId) -> Result<Vec<Allocation>> {
        let inner = self.inner.read().await;
        Ok(inner.allocations.get(id).cloned().unwrap_or_default())
    }
}
