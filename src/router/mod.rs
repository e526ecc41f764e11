//! Best-execution pipeline: validate, aggregate, select, bound by slippage.
//!
//! [`QuoteEngine`] runs those four stages and moves no funds.
//! [`SwapExecutor`] re-runs them and then settles against a ledger.

use ethers::types::U256;
use std::sync::Arc;
use tracing::info;

pub mod executor;
pub mod selector;
pub mod slippage;
pub mod validation;

pub use executor::{SwapExecutor, SwapState};
pub use selector::select_best;
pub use slippage::minimum_out;
pub use validation::validate;

use crate::aggregator::QuoteAggregator;
use crate::config::RouterConfig;
use crate::dex::VenueRegistry;
use crate::errors::SwapError;
use crate::models::{QuoteReport, SwapRequest, ValidatedRequest};
use crate::report::{EventSink, RouterEvent};

/// Pure quoting front end (stages 1-4).
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    aggregator: QuoteAggregator,
    sink: Arc<dyn EventSink>,
}

impl QuoteEngine {
    pub fn new(aggregator: QuoteAggregator, sink: Arc<dyn EventSink>) -> Self {
        Self { aggregator, sink }
    }

    pub fn from_config(
        venues: VenueRegistry,
        config: &RouterConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::new(QuoteAggregator::new(venues, config.venue_timeout), sink)
    }

    pub fn aggregator(&self) -> &QuoteAggregator {
        &self.aggregator
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Every venue quote plus the selected best and its minimum output,
    /// without emitting a record.
    pub async fn analyze(&self, request: &SwapRequest) -> Result<QuoteReport, SwapError> {
        let validated = validate(request)?;
        self.best_execution(&validated).await
    }

    /// Minimum acceptable output for `request` at the best venue.
    ///
    /// Emits [`RouterEvent::MinAmountOutCalculated`]; moves no funds.
    pub async fn quote(&self, request: &SwapRequest) -> Result<U256, SwapError> {
        self.quote_with_report(request)
            .await
            .map(|report| report.min_amount_out)
    }

    /// Same as [`QuoteEngine::quote`] but hands back the full report.
    pub async fn quote_with_report(&self, request: &SwapRequest) -> Result<QuoteReport, SwapError> {
        let validated = validate(request)?;
        let report = self.best_execution(&validated).await?;
        info!(
            venue = %report.best.venue,
            best = %report.best.amount_out,
            min_amount_out = %report.min_amount_out,
            slippage_bps = validated.slippage_bps(),
            "[QUOTE] minimum output calculated"
        );
        self.sink.emit(RouterEvent::MinAmountOutCalculated {
            token_in: validated.token_in(),
            token_out: validated.token_out(),
            amount_in: validated.amount_in(),
            slippage_bps: validated.slippage_bps(),
            venue: report.best.venue,
            best_amount_out: report.best.amount_out,
            min_amount_out: report.min_amount_out,
        });
        Ok(report)
    }

    /// Stages 2-4 for an already validated request.
    pub(crate) async fn best_execution(
        &self,
        request: &ValidatedRequest,
    ) -> Result<QuoteReport, SwapError> {
        let quotes = self
            .aggregator
            .collect_quotes(request.token_in(), request.token_out(), request.amount_in())
            .await;
        let best = select_best(&quotes)?;
        let min_amount_out = minimum_out(best.amount_out, request.slippage_bps());
        Ok(QuoteReport {
            quotes,
            best,
            min_amount_out,
        })
    }
}
