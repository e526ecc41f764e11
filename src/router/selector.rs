//! Best-execution selection over collected quotes.

use crate::errors::SwapError;
use crate::models::Quote;

/// Pick the quote with the greatest `amount_out`.
///
/// Ties go to the quote that appears first, i.e. the venue queried earliest
/// in registry order. Fails with [`SwapError::NoLiquidity`] on an empty slice.
pub fn select_best(quotes: &[Quote]) -> Result<Quote, SwapError> {
    let mut iter = quotes.iter();
    let mut best = *iter.next().ok_or(SwapError::NoLiquidity)?;
    for quote in iter {
        if quote.amount_out > best.amount_out {
            best = *quote;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VenueKind;
    use ethers::types::U256;

    fn quote(venue: VenueKind, amount: u64) -> Quote {
        Quote {
            venue,
            amount_out: U256::from(amount),
        }
    }

    #[test]
    fn empty_means_no_liquidity() {
        assert_eq!(select_best(&[]), Err(SwapError::NoLiquidity));
    }

    #[test]
    fn picks_maximum_output() {
        let quotes = [
            quote(VenueKind::ConstantProduct, 1_990_000),
            quote(VenueKind::ConcentratedLiquidity(500), 2_000_000),
            quote(VenueKind::ConcentratedLiquidity(3000), 1_995_000),
        ];
        let best = select_best(&quotes).unwrap();
        assert_eq!(best.venue, VenueKind::ConcentratedLiquidity(500));
        assert_eq!(best.amount_out, U256::from(2_000_000u64));
    }

    #[test]
    fn tie_goes_to_first_seen() {
        let quotes = [
            quote(VenueKind::ConstantProduct, 10),
            quote(VenueKind::ConcentratedLiquidity(3000), 42),
            quote(VenueKind::ConcentratedLiquidity(500), 42),
        ];
        assert_eq!(
            select_best(&quotes).unwrap().venue,
            VenueKind::ConcentratedLiquidity(3000)
        );
    }
}
