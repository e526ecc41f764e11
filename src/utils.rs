//! Miscellaneous helper utilities.

use bigdecimal::BigDecimal;
use ethers::types::U256;
use num_bigint::BigInt;
use num_traits::{One, Signed};
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt};

use crate::errors::{AppError, Result};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Raw token amount as a decimal with `decimals` fractional digits.
pub fn format_units(amount: U256, decimals: u32) -> BigDecimal {
    let digits = BigInt::parse_bytes(amount.to_string().as_bytes(), 10).unwrap_or_default();
    BigDecimal::new(digits, i64::from(decimals))
}

/// Decimal display amount (e.g. "1000.5") to raw token units.
pub fn parse_units(value: &str, decimals: u32) -> Result<U256> {
    let parsed = BigDecimal::from_str(value.trim())
        .map_err(|e| AppError::Config(format!("invalid amount {value:?}: {e}")))?;
    if parsed.is_negative() {
        return Err(AppError::Config(format!("amount {value:?} is negative")));
    }
    let scale = BigDecimal::new(BigInt::one(), -i64::from(decimals));
    let scaled = parsed * scale;
    if !scaled.is_integer() {
        return Err(AppError::Config(format!(
            "amount {value:?} has more than {decimals} decimal places"
        )));
    }
    let (raw, _) = scaled.with_scale(0).into_bigint_and_exponent();
    U256::from_dec_str(&raw.to_string())
        .map_err(|_| AppError::Config(format!("amount {value:?} does not fit in 256 bits")))
}
