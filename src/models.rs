//! Shared data structures used throughout the router.

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Concentrated-liquidity fee tiers queried when none are configured
/// (hundredths of a basis point: 0.05%, 0.3%, 1%).
pub const DEFAULT_FEE_TIERS: [u32; 3] = [500, 3000, 10000];

/// Denominator for basis-point arithmetic.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Fixed-width identifier of a fungible asset. The zero address means "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Address);

impl AssetId {
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Address> for AssetId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl FromStr for AssetId {
    type Err = <Address as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Address>().map(Self)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Liquidity venue family plus, for concentrated liquidity, the fee tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fee_tier")]
pub enum VenueKind {
    ConstantProduct,
    ConcentratedLiquidity(u32),
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueKind::ConstantProduct => write!(f, "V2"),
            // fee tiers are hundredths of a bps: 3000 -> 0.3%
            VenueKind::ConcentratedLiquidity(fee) => {
                let whole = fee / 10_000;
                let frac = fee % 10_000;
                if frac == 0 {
                    write!(f, "V3 {whole}%")
                } else {
                    let digits = format!("{frac:04}");
                    write!(f, "V3 {whole}.{}%", digits.trim_end_matches('0'))
                }
            }
        }
    }
}

/// Output a venue reported for a fixed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub venue: VenueKind,
    pub amount_out: U256,
}

/// Caller's exchange request, as received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub token_in: AssetId,
    pub token_out: AssetId,
    pub amount_in: U256,
    pub slippage_bps: u32,
}

impl SwapRequest {
    pub fn new(
        token_in: impl Into<AssetId>,
        token_out: impl Into<AssetId>,
        amount_in: U256,
        slippage_bps: u32,
    ) -> Self {
        Self {
            token_in: token_in.into(),
            token_out: token_out.into(),
            amount_in,
            slippage_bps,
        }
    }
}

/// A request that passed validation. Only `router::validation` builds one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedRequest(SwapRequest);

impl ValidatedRequest {
    pub(crate) fn new_unchecked(request: SwapRequest) -> Self {
        Self(request)
    }

    pub fn token_in(&self) -> AssetId {
        self.0.token_in
    }

    pub fn token_out(&self) -> AssetId {
        self.0.token_out
    }

    pub fn amount_in(&self) -> U256 {
        self.0.amount_in
    }

    pub fn slippage_bps(&self) -> u32 {
        self.0.slippage_bps
    }

    pub fn request(&self) -> &SwapRequest {
        &self.0
    }
}

/// Outcome of a completed swap. `amount_out >= min_amount_out` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementResult {
    pub venue_used: VenueKind,
    pub amount_out: U256,
    pub min_amount_out: U256,
}

/// Every quote collected for a request together with the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteReport {
    pub quotes: Vec<Quote>,
    pub best: Quote,
    pub min_amount_out: U256,
}
