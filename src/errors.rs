use ethers::types::U256;
use thiserror::Error;

use crate::models::VenueKind;

pub type Result<T> = std::result::Result<T, AppError>;

/// Plumbing errors raised while wiring the router to a chain.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Provider error: {0}")]
    Provider(#[from] ethers::providers::ProviderError),
}

/// Malformed request, rejected before any venue is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("token address must not be zero")]
    InvalidToken,

    #[error("tokenIn and tokenOut must differ")]
    IdenticalTokens,

    #[error("amountIn must be greater than zero")]
    InvalidAmountIn,

    #[error("slippage must be below 10000 bps")]
    SlippageTooHigh,
}

/// Failure reported by a single venue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    #[error("venue unavailable: {0}")]
    Unavailable(String),

    #[error("no pool for {0}")]
    PoolNotFound(VenueKind),

    #[error("venue call timed out")]
    Timeout,

    #[error("contract call failed: {0}")]
    Contract(String),

    #[error("exchange failed: {0}")]
    Exchange(String),
}

/// Failure raised by the settlement ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: U256, required: U256 },

    #[error("insufficient allowance: have {available}, need {required}")]
    InsufficientAllowance { available: U256, required: U256 },

    #[error("balance overflow")]
    Overflow,
}

/// Coarse classification of a [`SwapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller mistake; never retried.
    Request,
    /// No venue could quote the pair; may succeed later.
    Liquidity,
    /// Settlement aborted; no asset movement survives.
    Settlement,
}

/// Error surface of the `quote` and `swap` entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no liquidity available for the pair")]
    NoLiquidity,

    #[error("slippage violation: realized {realized} < minimum {minimum}")]
    SlippageViolation { realized: U256, minimum: U256 },

    #[error("transfer failed: {0}")]
    TransferFailure(#[from] LedgerError),

    #[error("exchange on {venue} failed: {source}")]
    ExchangeFailed {
        venue: VenueKind,
        #[source]
        source: VenueError,
    },

    #[error("settlement did not complete in time")]
    SettlementTimeout,
}

impl SwapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SwapError::Validation(_) => ErrorCategory::Request,
            SwapError::NoLiquidity => ErrorCategory::Liquidity,
            SwapError::SlippageViolation { .. }
            | SwapError::TransferFailure(_)
            | SwapError::ExchangeFailed { .. }
            | SwapError::SettlementTimeout => ErrorCategory::Settlement,
        }
    }

    /// Only liquidity errors are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Liquidity
    }
}
