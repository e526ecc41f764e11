//! Request checks performed before any venue is contacted.

use crate::errors::ValidationError;
use crate::models::{BPS_DENOMINATOR, SwapRequest, ValidatedRequest};

/// Validate a swap request, short-circuiting on the first failed check.
///
/// Order: token addresses, token identity, amount, slippage.
pub fn validate(request: &SwapRequest) -> Result<ValidatedRequest, ValidationError> {
    if request.token_in.is_zero() || request.token_out.is_zero() {
        return Err(ValidationError::InvalidToken);
    }
    if request.token_in == request.token_out {
        return Err(ValidationError::IdenticalTokens);
    }
    if request.amount_in.is_zero() {
        return Err(ValidationError::InvalidAmountIn);
    }
    if request.slippage_bps >= BPS_DENOMINATOR {
        return Err(ValidationError::SlippageTooHigh);
    }
    Ok(ValidatedRequest::new_unchecked(*request))
}
