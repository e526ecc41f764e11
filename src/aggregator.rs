//! Scatter-gather quote collection across every registered venue.

use ethers::types::U256;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::dex::{VenueClient, VenueRegistry};
use crate::errors::VenueError;
use crate::models::{AssetId, Quote, VenueKind};

/// Fans a quote request out to all venues and gathers whatever comes back.
#[derive(Debug, Clone)]
pub struct QuoteAggregator {
    venues: VenueRegistry,
    venue_timeout: Duration,
}

impl QuoteAggregator {
    pub fn new(venues: VenueRegistry, venue_timeout: Duration) -> Self {
        Self {
            venues,
            venue_timeout,
        }
    }

    pub fn venues(&self) -> &VenueRegistry {
        &self.venues
    }

    /// Query every venue concurrently and return the quotes that succeeded,
    /// in registry order.
    ///
    /// Never fails as a whole: a missing pool, an error, a timeout or a
    /// panicking client only removes that venue from the result. Dropping the
    /// returned future aborts every query still in flight.
    pub async fn collect_quotes(
        &self,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: U256,
    ) -> Vec<Quote> {
        let mut tasks = JoinSet::new();
        for (slot, (kind, client)) in self.venues.iter().enumerate() {
            let client = client.clone();
            let limit = self.venue_timeout;
            tasks.spawn(async move {
                let query = query_venue(client, kind, token_in, token_out, amount_in);
                let outcome = match timeout(limit, query).await {
                    Ok(result) => result,
                    Err(_) => Err(VenueError::Timeout),
                };
                (slot, kind, outcome)
            });
        }

        // tasks finish in any order; slots restore registry order
        let mut slots: Vec<Option<Quote>> = vec![None; self.venues.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, _, Ok(Some(quote)))) => {
                    debug!(
                        venue = %quote.venue,
                        amount_out = %quote.amount_out,
                        "[QUOTE] venue quoted"
                    );
                    slots[slot] = Some(quote);
                }
                Ok((_, kind, Ok(None))) => {
                    debug!(venue = %kind, "[QUOTE] no usable pool, skipping");
                }
                Ok((_, kind, Err(e))) => {
                    warn!(venue = %kind, error = %e, "[QUOTE] venue failed, skipping");
                }
                Err(e) => {
                    error!(error = %e, "[QUOTE] venue task panicked");
                }
            }
        }
        slots.into_iter().flatten().collect()
    }
}

/// Existence check then price query. `Ok(None)` means the venue has nothing
/// to offer: no pool, or a quote of zero.
async fn query_venue(
    client: Arc<dyn VenueClient>,
    kind: VenueKind,
    token_in: AssetId,
    token_out: AssetId,
    amount_in: U256,
) -> Result<Option<Quote>, VenueError> {
    if !client.pool_exists(kind, token_in, token_out).await? {
        return Ok(None);
    }
    let amount_out = client
        .quote_output(kind, token_in, token_out, amount_in)
        .await?;
    if amount_out.is_zero() {
        return Ok(None);
    }
    Ok(Some(Quote {
        venue: kind,
        amount_out,
    }))
}
