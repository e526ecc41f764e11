//! Liquidity venue capability and the registry the router fans out over.
//!
//! A venue answers three questions for a token pair: does a pool exist, what
//! would an input yield, and (for settlement only) execute the exchange.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::fmt;
use std::sync::Arc;

use crate::errors::VenueError;
use crate::models::{AssetId, VenueKind};

pub mod token;
pub mod uniswap_v2;
pub mod uniswap_v3;

pub use uniswap_v2::UniswapV2Venue;
pub use uniswap_v3::UniswapV3Venue;

/// Everything a venue needs to execute one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOrder {
    pub venue: VenueKind,
    pub token_in: AssetId,
    pub token_out: AssetId,
    pub amount_in: U256,
    /// Lower bound a venue may enforce itself; the executor checks it again.
    pub min_amount_out: U256,
    pub recipient: Address,
}

/// Per-venue capability consumed by the router.
#[async_trait]
pub trait VenueClient: Send + Sync + fmt::Debug {
    /// Whether a pool for the pair exists at this venue.
    async fn pool_exists(
        &self,
        venue: VenueKind,
        token_in: AssetId,
        token_out: AssetId,
    ) -> Result<bool, VenueError>;

    /// Output `amount_in` would yield at the current pool state.
    async fn quote_output(
        &self,
        venue: VenueKind,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: U256,
    ) -> Result<U256, VenueError>;

    /// Execute the exchange and return the realized output amount.
    async fn exchange(&self, order: &ExchangeOrder) -> Result<U256, VenueError>;
}

/// Ordered set of venues. Registration order is the aggregation order and
/// therefore decides ties between equal quotes.
#[derive(Debug, Clone, Default)]
pub struct VenueRegistry {
    venues: Vec<(VenueKind, Arc<dyn VenueClient>)>,
}

impl VenueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` for `kind`. A later registration for the same kind
    /// replaces the client but keeps the original position.
    pub fn register(&mut self, kind: VenueKind, client: Arc<dyn VenueClient>) {
        match self.venues.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = client,
            None => self.venues.push((kind, client)),
        }
    }

    pub fn with_venue(mut self, kind: VenueKind, client: Arc<dyn VenueClient>) -> Self {
        self.register(kind, client);
        self
    }

    /// One constant-product venue followed by one concentrated-liquidity
    /// venue per fee tier, in the given order.
    pub fn uniswap(
        constant_product: Option<Arc<dyn VenueClient>>,
        concentrated: Arc<dyn VenueClient>,
        fee_tiers: &[u32],
    ) -> Self {
        let mut registry = Self::new();
        if let Some(client) = constant_product {
            registry.register(VenueKind::ConstantProduct, client);
        }
        for fee in fee_tiers {
            registry.register(VenueKind::ConcentratedLiquidity(*fee), concentrated.clone());
        }
        registry
    }

    pub fn get(&self, kind: VenueKind) -> Option<Arc<dyn VenueClient>> {
        self.venues
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, client)| client.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (VenueKind, &Arc<dyn VenueClient>)> {
        self.venues.iter().map(|(kind, client)| (*kind, client))
    }

    pub fn kinds(&self) -> Vec<VenueKind> {
        self.venues.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}
