//! # Rate-Limit Computation
//!
//! Per-poster order quota for a round, proportional to stake:
//!
//! ```text
//! total       = Σ balance
//! orderLimit  = floor(balance * limit / total)
//! streamLimit = 1
//! ```
//!
//! The product is taken in 512-bit arithmetic so it cannot overflow, and the
//! division truncates. Every replica (and the peg) runs this same function,
//! which is what lets a rebalance proposal be compared for strict equality.
//! Because each term is floored, the quotas never sum above `limit`.

use pc_03_state_store::State;
use primitive_types::{U256, U512};
use shared_types::{EthAddress, LimitMap, PosterLimit};

/// Compute the quota map for a set of balances.
///
/// Zero balances get a zero order quota (they are normally never present:
/// the state drops zero-balance posters).
pub fn gen_limits<I>(balances: I, limit: u64) -> LimitMap
where
    I: IntoIterator<Item = (EthAddress, U256)>,
{
    let balances: Vec<(EthAddress, U256)> = balances.into_iter().collect();
    let total = balances
        .iter()
        .fold(U512::zero(), |acc, (_, balance)| acc + U512::from(*balance));

    balances
        .into_iter()
        .map(|(address, balance)| {
            let order_limit = if total.is_zero() {
                0
            } else {
                // Quotient is at most `limit`, so it fits in a u64.
                (balance.full_mul(U256::from(limit)) / total).low_u64()
            };
            (
                address,
                PosterLimit {
                    order_limit,
                    stream_limit: 1,
                },
            )
        })
        .collect()
}

/// Quota map for the posters currently in `state`, using the state's round
/// limit.
pub fn limits_for_state(state: &State) -> LimitMap {
    gen_limits(
        state.posters.iter().map(|(address, p)| (*address, p.balance)),
        state.round.limit,
    )
}
