/*!
# Pledge Core Types

Strict value types shared by the pledge fee-escrow reward system:

- **amounts**: unsigned raw-token-unit arithmetic (`RawAmount`) with checked
  operations; fractional math never reaches a persisted amount
- **addresses**: validated wallet/mint address newtypes and opaque ids
- **milestone**: read-only views of escrow milestones and per-wallet voting
  signals, plus the eligibility window derived from them
- **distribution**: the immutable settlement record for one milestone's
  reward payout and its per-wallet allocations

Everything here is a plain data type. Engines and stores live in
`pledge-rewards`.
*/

pub mod address;
pub mod amount;
pub mod distribution;
pub mod error;
pub mod milestone;

pub use address::{CommitmentId, MilestoneId, MintAddress, WalletAddress};
pub use amount::RawAmount;
pub use distribution::{Allocation, Distribution, DistributionId, DistributionStatus};
pub use error::{Result, TypeError};
pub use milestone::{Milestone, MilestoneKind, VoteSignal, VoteWindow};
