use crate::settlement::SkipReason;
use pledge_types::{RawAmount, VoteSignal, WalletAddress};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

const BPS_DENOMINATOR: f64 = 10_000.0;

/// One wallet's computed share before persistence. `weight` is the
/// floating-point input retained for audit; `amount` is authoritative.
#[derive(Debug, Clone)]
pub struct AllocationEntry {
    pub wallet: WalletAddress,
    pub amount: RawAmount,
    pub weight: f64,
}

/// The full allocation set for a candidate distribution. The entry amounts
/// sum to `pool_amount` exactly.
#[derive(Debug, Clone)]
pub struct ComputedAllocations {
    pub pool_amount: RawAmount,
    pub entries: Vec<AllocationEntry>,
}

/// Ineligibility is a normal outcome, not an error.
pub type AllocationResult = std::result::Result<ComputedAllocations, SkipReason>;

fn ship_fraction(signal: &VoteSignal) -> Option<f64> {
    match signal.ship_multiplier_bps {
        Some(bps) if bps > 0 => Some(bps as f64 / BPS_DENOMINATOR),
        _ => None,
    }
}

/// Floor a ratio result into raw units, failing closed on anything outside
/// the representable range.
fn floor_to_raw(value: f64) -> Option<RawAmount> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let floored = value.floor();
    if floored >= u64::MAX as f64 {
        return None;
    }
    Some(RawAmount::from_raw(floored as u64))
}

/// Fixed / per-vote mode: each signal earns
/// `floor(per_vote * (ship_bps / 10000) * participation)`, and the pool is
/// discovered as the sum of the individual amounts.
pub fn compute_per_vote(
    signals: &[VoteSignal],
    multipliers: &HashMap<WalletAddress, f64>,
    per_vote: RawAmount,
    max_pool: RawAmount,
) -> AllocationResult {
    let mut per_wallet: HashMap<WalletAddress, (RawAmount, f64)> = HashMap::new();

    for signal in signals {
        let Some(fraction) = ship_fraction(signal) else {
            debug!(wallet = %signal.wallet, "Skipping signal without positive ship multiplier");
            continue;
        };
        let participation = multipliers.get(&signal.wallet).copied().unwrap_or(1.0);
        let effective = fraction * participation;
        if effective <= 0.0 {
            continue;
        }

        let Some(amount) = floor_to_raw(per_vote.to_raw() as f64 * effective) else {
            return Err(SkipReason::AmountOverflow);
        };
        if amount.is_zero() {
            continue;
        }

        let entry = per_wallet
            .entry(signal.wallet.clone())
            .or_insert((RawAmount::ZERO, 0.0));
        entry.0 = match entry.0.checked_add(amount) {
            Some(total) => total,
            None => return Err(SkipReason::AmountOverflow),
        };
        entry.1 += effective;
    }

    let mut pool = RawAmount::ZERO;
    for (amount, _) in per_wallet.values() {
        pool = match pool.checked_add(*amount) {
            Some(total) => total,
            None => return Err(SkipReason::AmountOverflow),
        };
    }

    if pool.is_zero() {
        return Err(SkipReason::ZeroPool);
    }
    if pool > max_pool {
        return Err(SkipReason::PoolCapExceeded);
    }

    let mut entries: Vec<AllocationEntry> = per_wallet
        .into_iter()
        .map(|(wallet, (amount, weight))| AllocationEntry {
            wallet,
            amount,
            weight,
        })
        .collect();
    entries.sort_by(|a, b| a.wallet.cmp(&b.wallet));

    Ok(ComputedAllocations {
        pool_amount: pool,
        entries,
    })
}

/// Pool mode: a pre-declared pool split pro-rata by
/// `base_weighted_amount * (ship_bps / 10000) * participation`, floored per
/// wallet, with the rounding remainder assigned to the first wallet in the
/// deterministic order (weight descending, then address ascending).
pub fn compute_pool(
    signals: &[VoteSignal],
    multipliers: &HashMap<WalletAddress, f64>,
    pool: RawAmount,
) -> AllocationResult {
    if pool.is_zero() {
        return Err(SkipReason::ZeroPool);
    }

    let mut weights: HashMap<WalletAddress, f64> = HashMap::new();
    for signal in signals {
        let Some(fraction) = ship_fraction(signal) else {
            debug!(wallet = %signal.wallet, "Skipping signal without positive ship multiplier");
            continue;
        };
        let participation = multipliers.get(&signal.wallet).copied().unwrap_or(1.0);
        let weight = signal.base_weighted_amount.to_raw() as f64 * fraction * participation;
        if weight > 0.0 {
            *weights.entry(signal.wallet.clone()).or_insert(0.0) += weight;
        }
    }

    let total: f64 = weights.values().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(SkipReason::NoEligibleWeight);
    }

    let mut ranked: Vec<(WalletAddress, f64)> = weights.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut entries = Vec::with_capacity(ranked.len());
    let mut allocated = RawAmount::ZERO;
    for (wallet, weight) in ranked {
        let Some(amount) = floor_to_raw(pool.to_raw() as f64 * (weight / total)) else {
            return Err(SkipReason::AmountOverflow);
        };
        allocated = match allocated.checked_add(amount) {
            Some(total) => total,
            None => return Err(SkipReason::AmountOverflow),
        };
        entries.push(AllocationEntry {
            wallet,
            amount,
            weight,
        });
    }

    // Flooring dust lands on the top-ranked wallet so the allocation sum
    // equals the declared pool exactly.
    let Some(remainder) = pool.checked_sub(allocated) else {
        return Err(SkipReason::AmountOverflow);
    };
    if let Some(first) = entries.first_mut() {
        first.amount = match first.amount.checked_add(remainder) {
            Some(total) => total,
            None => return Err(SkipReason::AmountOverflow),
        };
    }

    entries.retain(|e| !e.amount.is_zero());
    if entries.is_empty() {
        return Err(SkipReason::NoEligibleWeight);
    }

    Ok(ComputedAllocations {
        pool_amount: pool,
        entries,
    })
}
