//! Auditable records emitted by the router.

use ethers::types::{Address, U256};
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

use crate::models::{AssetId, VenueKind};

/// Append-only record stream. `MinAmountOutCalculated` is informational;
/// `SwapExecuted` is written once per settled swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RouterEvent {
    #[serde(rename_all = "camelCase")]
    MinAmountOutCalculated {
        token_in: AssetId,
        token_out: AssetId,
        amount_in: U256,
        slippage_bps: u32,
        venue: VenueKind,
        best_amount_out: U256,
        min_amount_out: U256,
    },
    #[serde(rename_all = "camelCase")]
    SwapExecuted {
        caller: Address,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: U256,
        min_amount_out: U256,
        amount_out: U256,
        venue: VenueKind,
    },
}

/// Destination for [`RouterEvent`]s.
pub trait EventSink: Send + Sync + fmt::Debug {
    fn emit(&self, event: RouterEvent);
}

/// Logs each event as a single JSON object.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: RouterEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "swap_router::audit", event = %json, "[AUDIT]"),
            Err(e) => warn!(error = %e, ?event, "[AUDIT] failed to encode event"),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RouterEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RouterEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: RouterEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
