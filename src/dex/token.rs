//! ERC-20 helpers shared by the on-chain venues.

use ethers::{
    abi::Detokenize,
    contract::{ContractCall, abigen},
    providers::Middleware,
    types::{Address, TransactionReceipt, U64, U256},
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::errors::VenueError;
use crate::models::AssetId;

abigen!(
    Erc20,
    r"[
        function balanceOf(address owner) view returns (uint256)
        function allowance(address owner, address spender) view returns (uint256)
        function approve(address spender, uint256 amount) returns (bool)
    ]",
);

/// Balance of `owner` in `token`.
pub async fn balance_of<M: Middleware + 'static>(
    client: &Arc<M>,
    token: AssetId,
    owner: Address,
) -> Result<U256, VenueError> {
    Erc20::new(token.address(), client.clone())
        .balance_of(owner)
        .call()
        .await
        .map_err(|e| VenueError::Contract(e.to_string()))
}

/// Make sure `spender` may pull at least `amount` of `token` from `owner`.
pub async fn ensure_allowance<M: Middleware + 'static>(
    client: &Arc<M>,
    token: AssetId,
    owner: Address,
    spender: Address,
    amount: U256,
) -> Result<(), VenueError> {
    let erc20 = Erc20::new(token.address(), client.clone());
    let current = erc20
        .allowance(owner, spender)
        .call()
        .await
        .map_err(|e| VenueError::Contract(e.to_string()))?;
    if current >= amount {
        return Ok(());
    }
    debug!(%token, ?spender, %amount, "[VENUE] approving spender");
    send_and_confirm(erc20.approve(spender, amount)).await?;
    Ok(())
}

/// Send a state-changing call and wait for a successful receipt.
pub async fn send_and_confirm<M: Middleware + 'static, D: Detokenize>(
    call: ContractCall<M, D>,
) -> Result<TransactionReceipt, VenueError> {
    let pending = call
        .send()
        .await
        .map_err(|e| VenueError::Exchange(e.to_string()))?;
    let receipt = pending
        .await
        .map_err(|e| VenueError::Exchange(e.to_string()))?
        .ok_or_else(|| VenueError::Exchange("transaction dropped before inclusion".into()))?;
    if receipt.status != Some(U64::from(1)) {
        return Err(VenueError::Exchange(format!(
            "transaction {:?} reverted",
            receipt.transaction_hash
        )));
    }
    Ok(receipt)
}

/// Unix timestamp `ttl` from now, as a contract deadline.
pub fn deadline_after(ttl: Duration) -> U256 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    U256::from(now + ttl.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_in_the_future() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let deadline = deadline_after(Duration::from_secs(600));
        assert!(deadline >= U256::from(now + 600));
        assert!(deadline < U256::from(now + 700));
    }
}
