//! Concentrated-liquidity venues backed by Uniswap V3: one factory, the
//! QuoterV2 lens for pricing and SwapRouter02 for execution. A single client
//! serves every fee tier.

use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::Middleware,
    types::{Address, U256},
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::{ExchangeOrder, VenueClient, token};
use crate::errors::VenueError;
use crate::models::{AssetId, VenueKind};

abigen!(
    IUniswapV3Factory,
    r"[
        function getPool(address tokenA, address tokenB, uint24 fee) view returns (address pool)
    ]",
);

abigen!(
    IQuoterV2,
    r"[
        struct QuoteExactInputSingleParams { address tokenIn; address tokenOut; uint256 amountIn; uint24 fee; uint160 sqrtPriceLimitX96; }
        function quoteExactInputSingle(QuoteExactInputSingleParams memory params) returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate)
    ]",
);

abigen!(
    ISwapRouter02,
    r"[
        struct ExactInputSingleParams { address tokenIn; address tokenOut; uint24 fee; address recipient; uint256 amountIn; uint256 amountOutMinimum; uint160 sqrtPriceLimitX96; }
        function exactInputSingle(ExactInputSingleParams calldata params) payable returns (uint256 amountOut)
    ]",
);

/// Handle for a Uniswap V3 deployment.
#[derive(Clone)]
pub struct UniswapV3Venue<M> {
    client: Arc<M>,
    factory: IUniswapV3Factory<M>,
    quoter: IQuoterV2<M>,
    router: ISwapRouter02<M>,
}

impl<M: Middleware + 'static> UniswapV3Venue<M> {
    pub fn new(client: Arc<M>, factory: Address, quoter: Address, router: Address) -> Self {
        Self {
            factory: IUniswapV3Factory::new(factory, client.clone()),
            quoter: IQuoterV2::new(quoter, client.clone()),
            router: ISwapRouter02::new(router, client.clone()),
            client,
        }
    }
}

fn fee_of(venue: VenueKind) -> Result<u32, VenueError> {
    match venue {
        VenueKind::ConcentratedLiquidity(fee) => Ok(fee),
        other => Err(VenueError::Unavailable(format!(
            "{other} is not served by the V3 client"
        ))),
    }
}

impl<M: Middleware> fmt::Debug for UniswapV3Venue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniswapV3Venue")
            .field("factory", &self.factory.address())
            .field("quoter", &self.quoter.address())
            .field("router", &self.router.address())
            .finish()
    }
}

#[async_trait]
impl<M: Middleware + 'static> VenueClient for UniswapV3Venue<M> {
    async fn pool_exists(
        &self,
        venue: VenueKind,
        token_in: AssetId,
        token_out: AssetId,
    ) -> Result<bool, VenueError> {
        let fee = fee_of(venue)?;
        let pool = self
            .factory
            .get_pool(token_in.address(), token_out.address(), fee)
            .call()
            .await
            .map_err(|e| VenueError::Contract(e.to_string()))?;
        Ok(!pool.is_zero())
    }

    async fn quote_output(
        &self,
        venue: VenueKind,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: U256,
    ) -> Result<U256, VenueError> {
        let fee = fee_of(venue)?;
        let params = QuoteExactInputSingleParams {
            token_in: token_in.address(),
            token_out: token_out.address(),
            amount_in,
            fee,
            sqrt_price_limit_x96: U256::zero(),
        };
        // QuoterV2 is not a view function; it answers by simulating the swap
        let (amount_out, _, _, _) = self
            .quoter
            .quote_exact_input_single(params)
            .call()
            .await
            .map_err(|e| VenueError::Contract(e.to_string()))?;
        Ok(amount_out)
    }

    async fn exchange(&self, order: &ExchangeOrder) -> Result<U256, VenueError> {
        let fee = fee_of(order.venue)?;
        let sender = self
            .client
            .default_sender()
            .ok_or_else(|| VenueError::Exchange("client has no signer".into()))?;
        let before = token::balance_of(&self.client, order.token_out, order.recipient).await?;
        token::ensure_allowance(
            &self.client,
            order.token_in,
            sender,
            self.router.address(),
            order.amount_in,
        )
        .await?;

        let params = ExactInputSingleParams {
            token_in: order.token_in.address(),
            token_out: order.token_out.address(),
            fee,
            recipient: order.recipient,
            amount_in: order.amount_in,
            amount_out_minimum: order.min_amount_out,
            sqrt_price_limit_x96: U256::zero(),
        };
        let receipt = token::send_and_confirm(self.router.exact_input_single(params)).await?;
        debug!(tx = ?receipt.transaction_hash, fee, "[VENUE] V3 swap mined");

        let after = token::balance_of(&self.client, order.token_out, order.recipient).await?;
        Ok(after.saturating_sub(before))
    }
}
