/*!
# Pledge Reward Engine

Vote-weighted reward distribution for the pledge fee escrow: once a
milestone's voting window closes, this crate decides how much reward
currency each participating wallet earned and settles the milestone into
exactly one immutable distribution, no matter how many concurrent callers
race to trigger it.

## Components

- **window**: pure resolution of a milestone's eligibility window from its
  review/due/completion timestamps and a configured cutoff
- **participation**: per-wallet streak multipliers from a bounded window of
  recent closed milestones, forgiving windows that closed before a wallet
  first showed up
- **allocation**: per-wallet raw-unit amounts in one of two mutually
  exclusive payout modes (fixed per-vote, or a pre-declared pool split
  pro-rata with deterministic remainder placement)
- **settlement**: the idempotent create-or-confirm protocol — the durable
  store's atomic conditional insert is the only serialization point between
  racing callers
- **backfill**: opportunistic, budget-bounded settlement sweeps over a
  wallet's recent pairs
- **sources** / **store**: collaborator seams for signal history, chain
  facts, and the durable distribution store, with in-memory implementations
  for tests and development

## Example

```no_run
use pledge_rewards::{
    BackfillDriver, FixedChainFacts, MemoryDistributionStore, MemorySignalSource,
    RewardConfig, SettlementEngine,
};
use pledge_types::WalletAddress;
use std::sync::Arc;

# async fn run() -> pledge_rewards::Result<()> {
let engine = Arc::new(SettlementEngine::new(
    Arc::new(MemorySignalSource::new()),
    Arc::new(FixedChainFacts::new(1_700_000_000)),
    Arc::new(MemoryDistributionStore::new()),
    RewardConfig::default(),
)?);

let driver = BackfillDriver::new(engine);
let wallet = WalletAddress::new("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin").unwrap();
let report = driver.run(&wallet).await?;
println!("considered {} created {}", report.pairs_considered, report.distributions_created);
# Ok(())
# }
```
*/

pub mod allocation;
pub mod backfill;
pub mod config;
pub mod error;
pub mod participation;
pub mod settlement;
pub mod sources;
pub mod store;
pub mod window;

pub use allocation::{AllocationEntry, ComputedAllocations};
pub use backfill::{BackfillDriver, BackfillReport};
pub use config::{PayoutMode, RewardConfig, MAX_BACKFILL_CREATIONS, MAX_BACKFILL_PAIRS};
pub use error::{Result, RewardError};
pub use participation::ParticipationCalculator;
pub use settlement::{SettlementEngine, SettlementOutcome, SkipReason};
pub use sources::{ChainFacts, FixedChainFacts, MemorySignalSource, MintFacts, SignalSource};
pub use store::{DistributionStore, InsertOutcome, MemoryDistributionStore};
pub use window::resolve_window;
