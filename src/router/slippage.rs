//! Basis-point slippage bound.

use ethers::types::U256;
use num_bigint::BigUint;

use crate::models::BPS_DENOMINATOR;

/// `floor(best_amount * (10000 - slippage_bps) / 10000)`.
///
/// The product is taken as an arbitrary-width integer so no `U256` input can
/// overflow. Callers validate `slippage_bps < 10000`; larger values saturate
/// to zero.
pub fn minimum_out(best_amount: U256, slippage_bps: u32) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps);
    let wide = to_biguint(best_amount) * BigUint::from(keep) / BigUint::from(BPS_DENOMINATOR);
    // wide <= best_amount, so it always fits back into 256 bits
    U256::from_big_endian(&wide.to_bytes_be())
}

fn to_biguint(value: U256) -> BigUint {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigUint::from_bytes_be(&buf)
}
