//! Slippage-protected settlement.

use ethers::types::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{QuoteEngine, validate};
use crate::dex::ExchangeOrder;
use crate::errors::{SwapError, VenueError};
use crate::ledger::Ledger;
use crate::models::{SettlementResult, SwapRequest, ValidatedRequest, VenueKind};
use crate::report::RouterEvent;

/// Lifecycle of one swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    Idle,
    Validated,
    Quoted,
    Settling,
    Settled,
    Aborted,
}

impl SwapState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SwapState::Settled | SwapState::Aborted)
    }

    fn can_advance_to(self, next: SwapState) -> bool {
        use SwapState::*;
        matches!(
            (self, next),
            (Idle, Validated) | (Validated, Quoted) | (Quoted, Settling) | (Settling, Settled)
        ) || (next == Aborted && !self.is_terminal())
    }
}

/// State tracker for a single `execute_swap` call.
#[derive(Debug)]
pub(crate) struct SwapExecution {
    state: SwapState,
}

impl SwapExecution {
    pub(crate) fn new() -> Self {
        Self {
            state: SwapState::Idle,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> SwapState {
        self.state
    }

    fn advance(&mut self, next: SwapState) {
        if self.state.can_advance_to(next) {
            self.state = next;
        } else {
            warn!(from = ?self.state, to = ?next, "[SWAP] illegal state transition ignored");
        }
    }

    fn abort(&mut self, err: SwapError) -> SwapError {
        warn!(reached = ?self.state, error = %err, "[SWAP] aborted");
        self.advance(SwapState::Aborted);
        err
    }
}

/// Runs the full swap: quote, pull, exchange, verify, deliver, record.
#[derive(Debug, Clone)]
pub struct SwapExecutor {
    engine: Arc<QuoteEngine>,
    ledger: Arc<dyn Ledger>,
    /// Account that receives venue output before it is delivered to the caller.
    settlement_account: Address,
    settlement_timeout: Duration,
}

impl SwapExecutor {
    pub fn new(
        engine: Arc<QuoteEngine>,
        ledger: Arc<dyn Ledger>,
        settlement_account: Address,
        settlement_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            ledger,
            settlement_account,
            settlement_timeout,
        }
    }

    pub fn engine(&self) -> &QuoteEngine {
        &self.engine
    }

    /// Swap `request.amount_in` of `token_in` from `caller` for the best
    /// available amount of `token_out`.
    ///
    /// The minimum output is always recomputed here from fresh quotes. Either
    /// the caller is debited and credited in full, or nothing changes.
    pub async fn execute_swap(
        &self,
        caller: Address,
        request: &SwapRequest,
    ) -> Result<SettlementResult, SwapError> {
        let mut execution = SwapExecution::new();
        self.run(&mut execution, caller, request).await
    }

    pub(crate) async fn run(
        &self,
        execution: &mut SwapExecution,
        caller: Address,
        request: &SwapRequest,
    ) -> Result<SettlementResult, SwapError> {
        let validated = validate(request).map_err(|e| execution.abort(e.into()))?;
        execution.advance(SwapState::Validated);

        let report = self
            .engine
            .best_execution(&validated)
            .await
            .map_err(|e| execution.abort(e))?;
        execution.advance(SwapState::Quoted);

        let venue = report.best.venue;
        let min_amount_out = report.min_amount_out;
        execution.advance(SwapState::Settling);

        let settlement = self.settle(caller, &validated, venue, min_amount_out);
        let amount_out = match timeout(self.settlement_timeout, settlement).await {
            Ok(Ok(amount_out)) => amount_out,
            Ok(Err(e)) => return Err(execution.abort(e)),
            // the ledger unit was dropped with the future, nothing was applied
            Err(_) => return Err(execution.abort(SwapError::SettlementTimeout)),
        };
        execution.advance(SwapState::Settled);

        info!(
            ?caller,
            %venue,
            amount_in = %validated.amount_in(),
            %amount_out,
            %min_amount_out,
            "[SWAP] settled"
        );
        self.engine.sink().emit(RouterEvent::SwapExecuted {
            caller,
            token_in: validated.token_in(),
            token_out: validated.token_out(),
            amount_in: validated.amount_in(),
            min_amount_out,
            amount_out,
            venue,
        });

        Ok(SettlementResult {
            venue_used: venue,
            amount_out,
            min_amount_out,
        })
    }

    /// Steps 4-7 inside one ledger unit. Any early return drops the unit
    /// uncommitted, which undoes the pull.
    async fn settle(
        &self,
        caller: Address,
        request: &ValidatedRequest,
        venue: VenueKind,
        min_amount_out: U256,
    ) -> Result<U256, SwapError> {
        let client = self
            .engine
            .aggregator()
            .venues()
            .get(venue)
            .ok_or_else(|| SwapError::ExchangeFailed {
                venue,
                source: VenueError::Unavailable("venue is no longer registered".into()),
            })?;

        let mut unit = self.ledger.begin(caller).await?;
        unit.pull(request.token_in(), request.amount_in()).await?;

        let order = ExchangeOrder {
            venue,
            token_in: request.token_in(),
            token_out: request.token_out(),
            amount_in: request.amount_in(),
            min_amount_out,
            recipient: self.settlement_account,
        };
        let realized = client
            .exchange(&order)
            .await
            .map_err(|source| SwapError::ExchangeFailed { venue, source })?;

        if realized < min_amount_out {
            return Err(SwapError::SlippageViolation {
                realized,
                minimum: min_amount_out,
            });
        }

        unit.deliver(request.token_out(), realized).await?;
        unit.commit().await?;
        Ok(realized)
    }
}
