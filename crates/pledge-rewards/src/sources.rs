use crate::error::Result;
use async_trait::async_trait;
use pledge_types::{CommitmentId, Milestone, MilestoneId, MintAddress, VoteSignal, WalletAddress};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Chain-implied facts about a mint at settlement time.
#[derive(Debug, Clone)]
pub struct MintFacts {
    pub decimals: u8,
    pub token_program: String,
}

/// Authoritative clock and token-chain facts. External collaborator.
#[async_trait]
pub trait ChainFacts: Send + Sync {
    /// Current chain time, unix seconds. Window-closure decisions use this,
    /// never the host clock.
    async fn current_time(&self) -> Result<i64>;

    /// Decimals and owning token program for a mint, `None` if the mint
    /// does not exist.
    async fn mint_facts(&self, mint: &MintAddress) -> Result<Option<MintFacts>>;
}

/// Read-only access to milestones and per-wallet voting signals.
/// External collaborator; this subsystem never writes through it.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// All milestones of a commitment.
    async fn milestones(&self, commitment: &CommitmentId) -> Result<Vec<Milestone>>;

    /// All signals recorded for one milestone.
    async fn signals(
        &self,
        commitment: &CommitmentId,
        milestone: &MilestoneId,
    ) -> Result<Vec<VoteSignal>>;

    /// Per-wallet count of the given milestones each wallet signaled on.
    /// Wallets with no signals are absent from the map.
    async fn signal_counts(
        &self,
        commitment: &CommitmentId,
        wallets: &[WalletAddress],
        milestones: &[MilestoneId],
    ) -> Result<HashMap<WalletAddress, u32>>;

    /// Earliest signal time per wallet on this commitment. Wallets that
    /// never signaled are absent from the map.
    async fn first_signal_times(
        &self,
        commitment: &CommitmentId,
        wallets: &[WalletAddress],
    ) -> Result<HashMap<WalletAddress, i64>>;

    /// The most recent (commitment, milestone) pairs a wallet signaled on,
    /// most-recently-active first, deduplicated, at most `limit`.
    async fn recent_pairs(
        &self,
        wallet: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<(CommitmentId, MilestoneId)>>;
}

/// In-memory signal source for tests and development.
#[derive(Default)]
pub struct MemorySignalSource {
    inner: RwLock<MemorySignals>,
}

#[derive(Default)]
struct MemorySignals {
    milestones: Vec<Milestone>,
    signals: Vec<VoteSignal>,
}

impl MemorySignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_milestone(&self, milestone: Milestone) {
        let mut inner = self.inner.write().await;
        inner.milestones.push(milestone);
    }

    pub async fn add_signal(&self, signal: VoteSignal) {
        let mut inner = self.inner.write().await;
        inner.signals.push(signal);
    }
}

#[async_trait]
impl SignalSource for MemorySignalSource {
    async fn milestones(&self, commitment: &CommitmentId) -> Result<Vec<Milestone>> {
        let inner = self.inner.read().await;
        Ok(inner
            .milestones
            .iter()
            .filter(|m| &m.commitment_id == commitment)
            .cloned()
            .collect())
    }

    async fn signals(
        &self,
        commitment: &CommitmentId,
        milestone: &MilestoneId,
    ) -> Result<Vec<VoteSignal>> {
        let inner = self.inner.read().await;
        Ok(inner
            .signals
            .iter()
            .filter(|s| &s.commitment_id == commitment && &s.milestone_id == milestone)
            .cloned()
            .collect())
    }

    async fn signal_counts(
        &self,
        commitment: &CommitmentId,
        wallets: &[WalletAddress],
        milestones: &[MilestoneId],
    ) -> Result<HashMap<WalletAddress, u32>> {
        let inner = self.inner.read().await;
        let wallet_set: HashSet<_> = wallets.iter().collect();
        let milestone_set: HashSet<_> = milestones.iter().collect();

        let mut seen: HashSet<(&WalletAddress, &MilestoneId)> = HashSet::new();
        let mut counts: HashMap<WalletAddress, u32> = HashMap::new();
        for signal in &inner.signals {
            if &signal.commitment_id != commitment
                || !wallet_set.contains(&signal.wallet)
                || !milestone_set.contains(&signal.milestone_id)
            {
                continue;
            }
            if seen.insert((&signal.wallet, &signal.milestone_id)) {
                *counts.entry(signal.wallet.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn first_signal_times(
        &self,
        commitment: &CommitmentId,
        wallets: &[WalletAddress],
    ) -> Result<HashMap<WalletAddress, i64>> {
        let inner = self.inner.read().await;
        let wallet_set: HashSet<_> = wallets.iter().collect();

        let mut first_seen: HashMap<WalletAddress, i64> = HashMap::new();
        for signal in &inner.signals {
            if &signal.commitment_id != commitment || !wallet_set.contains(&signal.wallet) {
                continue;
            }
            first_seen
                .entry(signal.wallet.clone())
                .and_modify(|t| *t = (*t).min(signal.created_at))
                .or_insert(signal.created_at);
        }
        Ok(first_seen)
    }

    async fn recent_pairs(
        &self,
        wallet: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<(CommitmentId, MilestoneId)>> {
        let inner = self.inner.read().await;
        let mut own: Vec<&VoteSignal> = inner
            .signals
            .iter()
            .filter(|s| &s.wallet == wallet)
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut seen = HashSet::new();
        let mut pairs = Vec::new();
        for signal in own {
            let key = (signal.commitment_id.clone(), signal.milestone_id.clone());
            if seen.insert(key.clone()) {
                pairs.push(key);
                if pairs.len() >= limit {
                    break;
                }
            }
        }
        Ok(pairs)
    }
}

/// Chain facts with a manually advanced clock, for tests and development.
pub struct FixedChainFacts {
    now: AtomicI64,
    mints: RwLock<HashMap<MintAddress, MintFacts>>,
}

impl FixedChainFacts {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
            mints: RwLock::new(HashMap::new()),
        }
    }

    /// Clock seeded from the host's wall clock. Development only; real
    /// deployments use the chain's authoritative time.
    pub fn at_system_now() -> Self {
        Self::new(chrono::Utc::now().timestamp())
    }

    pub fn set_time(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub async fn insert_mint(&self, mint: MintAddress, facts: MintFacts) {
        let mut mints = self.mints.write().await;
        mints.insert(mint, facts);
    }
}

#[async_trait]
impl ChainFacts for FixedChainFacts {
    async fn current_time(&self) -> Result<i64> {
        Ok(self.now.load(Ordering::SeqCst))
    }

    async fn mint_facts(&self, mint: &MintAddress) -> Result<Option<MintFacts>> {
        let mints = self.mints.read().await;
        Ok(mints.get(mint).cloned())
    }
}
