//! Constant-product venue backed by a Uniswap V2 factory + router pair.

use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::Middleware,
    types::{Address, U256},
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{ExchangeOrder, VenueClient, token};
use crate::errors::VenueError;
use crate::models::{AssetId, VenueKind};

abigen!(
    IUniswapV2Factory,
    r"[
        function getPair(address tokenA, address tokenB) view returns (address pair)
    ]",
);

abigen!(
    IUniswapV2Router02,
    r"[
        function getAmountsOut(uint256 amountIn, address[] path) view returns (uint256[] amounts)
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) returns (uint256[] amounts)
    ]",
);

/// Default time a submitted swap stays valid on chain.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);

/// Handle for a Uniswap V2 deployment. Serves [`VenueKind::ConstantProduct`].
#[derive(Clone)]
pub struct UniswapV2Venue<M> {
    client: Arc<M>,
    factory: IUniswapV2Factory<M>,
    router: IUniswapV2Router02<M>,
    deadline: Duration,
}

impl<M: Middleware + 'static> UniswapV2Venue<M> {
    pub fn new(client: Arc<M>, factory: Address, router: Address) -> Self {
        Self {
            factory: IUniswapV2Factory::new(factory, client.clone()),
            router: IUniswapV2Router02::new(router, client.clone()),
            client,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    fn ensure_kind(&self, venue: VenueKind) -> Result<(), VenueError> {
        match venue {
            VenueKind::ConstantProduct => Ok(()),
            other => Err(VenueError::Unavailable(format!(
                "{other} is not served by the V2 client"
            ))),
        }
    }
}

impl<M: Middleware> fmt::Debug for UniswapV2Venue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniswapV2Venue")
            .field("factory", &self.factory.address())
            .field("router", &self.router.address())
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[async_trait]
impl<M: Middleware + 'static> VenueClient for UniswapV2Venue<M> {
    async fn pool_exists(
        &self,
        venue: VenueKind,
        token_in: AssetId,
        token_out: AssetId,
    ) -> Result<bool, VenueError> {
        self.ensure_kind(venue)?;
        let pair = self
            .factory
            .get_pair(token_in.address(), token_out.address())
            .call()
            .await
            .map_err(|e| VenueError::Contract(e.to_string()))?;
        Ok(!pair.is_zero())
    }

    async fn quote_output(
        &self,
        venue: VenueKind,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: U256,
    ) -> Result<U256, VenueError> {
        self.ensure_kind(venue)?;
        let amounts = self
            .router
            .get_amounts_out(amount_in, vec![token_in.address(), token_out.address()])
            .call()
            .await
            .map_err(|e| VenueError::Contract(e.to_string()))?;
        amounts
            .get(1)
            .copied()
            .ok_or_else(|| VenueError::Contract("getAmountsOut returned no output".into()))
    }

    async fn exchange(&self, order: &ExchangeOrder) -> Result<U256, VenueError> {
        self.ensure_kind(order.venue)?;
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

        let call = self.router.swap_exact_tokens_for_tokens(
            order.amount_in,
            order.min_amount_out,
            vec![order.token_in.address(), order.token_out.address()],
            order.recipient,
            token::deadline_after(self.deadline),
        );
        let receipt = token::send_and_confirm(call).await?;
        debug!(tx = ?receipt.transaction_hash, "[VENUE] V2 swap mined");

        let after = token::balance_of(&self.client, order.token_out, order.recipient).await?;
        Ok(after.saturating_sub(before))
    }
}
