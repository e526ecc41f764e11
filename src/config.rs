//! Configuration loader and application settings.
//!
//! Every loader reads through a `lookup` function so it can be driven by the
//! process environment (`load`) or by a plain map in tests (`from_lookup`).

use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, U256};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::errors::{AppError, Result};
use crate::models::{AssetId, DEFAULT_FEE_TIERS, SwapRequest};
use crate::utils::parse_units;

/// Uniswap deployments on Base mainnet.
pub mod base {
    pub const V2_FACTORY: &str = "0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6";
    pub const V2_ROUTER: &str = "0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24";
    pub const V3_FACTORY: &str = "0x33128a8fC17869897dcE68Ed026d694621f6FDfD";
    pub const V3_QUOTER_V2: &str = "0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a";
    pub const V3_SWAP_ROUTER_02: &str = "0x2626664c2603336E57B271c5C0b26F421741e481";
    pub const USDC: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    pub const WETH: &str = "0x4200000000000000000000000000000000000006";
}

/// Fee tiers are hundredths of a bps; 100% would be 1_000_000.
const MAX_FEE_TIER: u32 = 1_000_000;

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key}: invalid value {raw:?}"))),
        None => Ok(default),
    }
}

fn address_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<Address> {
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{key}: invalid address {raw:?}")))
}

/// Router behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Concentrated-liquidity fee tiers to query, in tie-break order.
    pub fee_tiers: Vec<u32>,
    /// Query the constant-product venue as well.
    pub include_constant_product: bool,
    /// Budget for one venue's existence check + price query.
    pub venue_timeout: Duration,
    /// Budget for pull, exchange, verification and delivery together.
    pub settlement_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            fee_tiers: DEFAULT_FEE_TIERS.to_vec(),
            include_constant_product: true,
            venue_timeout: Duration::from_secs(5),
            settlement_timeout: Duration::from_secs(60),
        }
    }
}

impl RouterConfig {
    /// Load from environment variables (`FEE_TIERS`, `INCLUDE_V2`,
    /// `VENUE_TIMEOUT_MS`, `SETTLEMENT_TIMEOUT_MS`).
    pub fn load() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let fee_tiers = match lookup("FEE_TIERS") {
            Some(raw) => parse_fee_tiers(&raw)?,
            None => defaults.fee_tiers,
        };
        let include_constant_product =
            parse_or(&lookup, "INCLUDE_V2", defaults.include_constant_product)?;
        let venue_timeout_ms = parse_or(
            &lookup,
            "VENUE_TIMEOUT_MS",
            defaults.venue_timeout.as_millis() as u64,
        )?;
        let settlement_timeout_ms = parse_or(
            &lookup,
            "SETTLEMENT_TIMEOUT_MS",
            defaults.settlement_timeout.as_millis() as u64,
        )?;

        let config = Self {
            fee_tiers,
            include_constant_product,
            venue_timeout: Duration::from_millis(venue_timeout_ms),
            settlement_timeout: Duration::from_millis(settlement_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fee_tiers.is_empty() && !self.include_constant_product {
            return Err(AppError::Config("no venues configured".into()));
        }
        if self.venue_timeout.is_zero() || self.settlement_timeout.is_zero() {
            return Err(AppError::Config("timeouts must be positive".into()));
        }
        Ok(())
    }
}

/// Parse a comma separated fee tier list, dropping duplicates but keeping
/// first-seen order.
fn parse_fee_tiers(raw: &str) -> Result<Vec<u32>> {
    let mut tiers = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let fee: u32 = part
            .parse()
            .map_err(|_| AppError::Config(format!("FEE_TIERS: invalid tier {part:?}")))?;
        if fee == 0 || fee >= MAX_FEE_TIER {
            return Err(AppError::Config(format!("FEE_TIERS: tier {fee} out of range")));
        }
        if !tiers.contains(&fee) {
            tiers.push(fee);
        }
    }
    Ok(tiers)
}

/// Chain endpoint and contract addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub rpc_url: Url,
    pub v2_factory: Address,
    pub v2_router: Address,
    pub v3_factory: Address,
    pub v3_quoter: Address,
    pub v3_router: Address,
}

impl ChainConfig {
    /// Load from `RPC_URL` (required) and optional contract overrides.
    pub fn load() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_raw = lookup("RPC_URL")
            .ok_or_else(|| AppError::Config("Set RPC_URL to your node HTTP endpoint".into()))?;
        let rpc_url = Url::parse(rpc_raw.trim())?;
        Ok(Self {
            rpc_url,
            v2_factory: address_or(&lookup, "V2_FACTORY", base::V2_FACTORY)?,
            v2_router: address_or(&lookup, "V2_ROUTER", base::V2_ROUTER)?,
            v3_factory: address_or(&lookup, "V3_FACTORY", base::V3_FACTORY)?,
            v3_quoter: address_or(&lookup, "V3_QUOTER", base::V3_QUOTER_V2)?,
            v3_router: address_or(&lookup, "V3_ROUTER", base::V3_SWAP_ROUTER_02)?,
        })
    }

    /// HTTP provider for `rpc_url`, checked by asking the node for its chain id.
    pub async fn connect(&self) -> Result<Arc<Provider<Http>>> {
        let provider = Provider::new(Http::new(self.rpc_url.clone()));
        let chain_id = provider.get_chainid().await?;
        info!(rpc = %self.rpc_url, %chain_id, "[INIT] connected to node");
        Ok(Arc::new(provider))
    }
}

/// Quote request for the command-line tool, with amounts in display units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteArgs {
    pub token_in: AssetId,
    pub token_out: AssetId,
    pub amount_in: U256,
    pub decimals_in: u32,
    pub decimals_out: u32,
    pub slippage_bps: u32,
}

impl QuoteArgs {
    /// Load from `TOKEN_IN`, `TOKEN_OUT`, `AMOUNT_IN`, `DECIMALS_IN`,
    /// `DECIMALS_OUT` and `SLIPPAGE_BPS`; defaults quote 1000 USDC -> WETH at 5%.
    pub fn load() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token_in = AssetId::from(address_or(&lookup, "TOKEN_IN", base::USDC)?);
        let token_out = AssetId::from(address_or(&lookup, "TOKEN_OUT", base::WETH)?);
        let decimals_in = parse_or(&lookup, "DECIMALS_IN", 6u32)?;
        let decimals_out = parse_or(&lookup, "DECIMALS_OUT", 18u32)?;
        let amount_raw = lookup("AMOUNT_IN").unwrap_or_else(|| "1000".to_string());
        let amount_in = parse_units(&amount_raw, decimals_in)?;
        let slippage_bps = parse_or(&lookup, "SLIPPAGE_BPS", 500u32)?;
        Ok(Self {
            token_in,
            token_out,
            amount_in,
            decimals_in,
            decimals_out,
            slippage_bps,
        })
    }

    pub fn request(&self) -> SwapRequest {
        SwapRequest::new(self.token_in, self.token_out, self.amount_in, self.slippage_bps)
    }
}
