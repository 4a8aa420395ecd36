use thiserror::Error;

/// Reward engine result type
pub type Result<T> = std::result::Result<T, RewardError>;

/// Failures that abort a single settlement attempt.
///
/// Ineligibility (automated milestone, open window, zero weight, zero pool)
/// is NOT an error; it is reported through
/// [`SettlementOutcome::Skipped`](crate::settlement::SettlementOutcome).
#[derive(Debug, Error)]
pub enum RewardError {
    #[error("Milestone not found: {0}")]
    MilestoneNotFound(String),

    #[error("Mint not found on chain: {0}")]
    MintNotFound(String),

    #[error("Mint decimals out of range: {decimals} (accepted 0..={max})")]
    DecimalsOutOfRange { decimals: u8, max: u8 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Signal source error: {0}")]
    Source(String),

    #[error("Chain facts error: {0}")]
    Chain(String),

    #[error("Distribution store error: {0}")]
    Store(String),
}
