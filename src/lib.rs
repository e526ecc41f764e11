//! Best-execution swap router.
//!
//! Quotes a token pair on every configured venue (one constant-product pool
//! and one concentrated-liquidity pool per fee tier), picks the highest
//! output, bounds it by the caller's slippage tolerance and, for swaps,
//! settles atomically against a ledger.

pub mod aggregator;
pub mod config;
pub mod dex;
pub mod errors;
pub mod ledger;
pub mod models;
pub mod report;
pub mod router;
pub mod utils;

pub use aggregator::QuoteAggregator;
pub use errors::{ErrorCategory, SwapError, ValidationError};
pub use models::{AssetId, Quote, QuoteReport, SettlementResult, SwapRequest, VenueKind};
pub use router::{QuoteEngine, SwapExecutor, SwapState};
