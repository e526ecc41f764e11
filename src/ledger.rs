//! Asset ledger the executor settles against.
//!
//! Settlement runs inside a [`LedgerTransaction`]: pulls and deliveries are
//! staged and only become visible on [`LedgerTransaction::commit`]. Dropping a
//! transaction without committing discards every staged change, so an aborted
//! or cancelled swap never leaves the caller debited.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::errors::LedgerError;
use crate::models::AssetId;

#[async_trait]
pub trait Ledger: Send + Sync + fmt::Debug {
    /// Open an all-or-nothing settlement unit for `caller`. Units for the same
    /// caller are serialised: a second `begin` waits until the first unit is
    /// committed or dropped.
    async fn begin(&self, caller: Address) -> Result<Box<dyn LedgerTransaction>, LedgerError>;
}

#[async_trait]
pub trait LedgerTransaction: Send {
    /// Take `amount` of `asset` from the caller (requires balance and allowance).
    async fn pull(&mut self, asset: AssetId, amount: U256) -> Result<(), LedgerError>;

    /// Credit `amount` of `asset` to the caller.
    async fn deliver(&mut self, asset: AssetId, amount: U256) -> Result<(), LedgerError>;

    /// Apply every staged change at once.
    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;
}

#[derive(Debug, Default)]
struct Accounts {
    balances: HashMap<(Address, AssetId), U256>,
    /// Amount the router may pull from each owner.
    allowances: HashMap<(Address, AssetId), U256>,
}

impl Accounts {
    fn balance(&self, owner: Address, asset: AssetId) -> U256 {
        self.balances.get(&(owner, asset)).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: Address, asset: AssetId) -> U256 {
        self.allowances.get(&(owner, asset)).copied().unwrap_or_default()
    }
}

type CallerLocks = Arc<Mutex<HashMap<Address, Arc<tokio::sync::Mutex<()>>>>>;

/// Process-local ledger with per-caller serialisation.
///
/// A caller's lock lives in `callers` only while a unit for that caller is
/// open or waiting.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: Arc<Mutex<Accounts>>,
    callers: CallerLocks,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&self, owner: Address, asset: AssetId, amount: U256) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let updated = accounts
            .balance(owner, asset)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        accounts.balances.insert((owner, asset), updated);
        Ok(())
    }

    /// Set how much of `asset` the router may pull from `owner`.
    pub fn approve(&self, owner: Address, asset: AssetId, amount: U256) {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.allowances.insert((owner, asset), amount);
    }

    pub fn balance_of(&self, owner: Address, asset: AssetId) -> U256 {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.balance(owner, asset)
    }

    pub fn allowance(&self, owner: Address, asset: AssetId) -> U256 {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.allowance(owner, asset)
    }

    fn caller_lock(&self, caller: Address) -> Arc<tokio::sync::Mutex<()>> {
        let mut callers = self.callers.lock().unwrap_or_else(PoisonError::into_inner);
        callers.entry(caller).or_default().clone()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn begin(&self, caller: Address) -> Result<Box<dyn LedgerTransaction>, LedgerError> {
        let guard = self.caller_lock(caller).lock_owned().await;
        debug!(?caller, "[LEDGER] settlement unit opened");
        Ok(Box::new(InMemoryTransaction {
            caller,
            accounts: self.accounts.clone(),
            callers: self.callers.clone(),
            staged: Vec::new(),
            guard: Some(guard),
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Staged {
    Pull(AssetId, U256),
    Deliver(AssetId, U256),
}

struct InMemoryTransaction {
    caller: Address,
    accounts: Arc<Mutex<Accounts>>,
    callers: CallerLocks,
    staged: Vec<Staged>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        // release first so the guard's handle no longer counts
        drop(self.guard.take());
        let mut callers = self.callers.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = callers
            .get(&self.caller)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            callers.remove(&self.caller);
        }
    }
}

/// Balance and allowance after applying `staged` on top of `accounts`.
fn project(
    accounts: &Accounts,
    caller: Address,
    asset: AssetId,
    staged: &[Staged],
) -> Result<(U256, U256), LedgerError> {
    let mut balance = accounts.balance(caller, asset);
    let mut allowance = accounts.allowance(caller, asset);
    for entry in staged {
        match *entry {
            Staged::Pull(a, amount) if a == asset => {
                balance = balance
                    .checked_sub(amount)
                    .ok_or(LedgerError::InsufficientBalance {
                        available: balance,
                        required: amount,
                    })?;
                allowance = allowance.checked_sub(amount).ok_or(
                    LedgerError::InsufficientAllowance {
                        available: allowance,
                        required: amount,
                    },
                )?;
            }
            Staged::Deliver(a, amount) if a == asset => {
                balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
            }
            _ => {}
        }
    }
    Ok((balance, allowance))
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn pull(&mut self, asset: AssetId, amount: U256) -> Result<(), LedgerError> {
        let mut staged = self.staged.clone();
        staged.push(Staged::Pull(asset, amount));
        {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            project(&accounts, self.caller, asset, &staged)?;
        }
        self.staged = staged;
        Ok(())
    }

    async fn deliver(&mut self, asset: AssetId, amount: U256) -> Result<(), LedgerError> {
        let mut staged = self.staged.clone();
        staged.push(Staged::Deliver(asset, amount));
        {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            project(&accounts, self.caller, asset, &staged)?;
        }
        self.staged = staged;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut assets: Vec<AssetId> = Vec::new();
        for entry in &self.staged {
            let (Staged::Pull(asset, _) | Staged::Deliver(asset, _)) = *entry;
            if !assets.contains(&asset) {
                assets.push(asset);
            }
        }
        // validate everything before writing anything
        let mut updates = Vec::with_capacity(assets.len());
        for asset in assets {
            let (balance, allowance) = project(&accounts, self.caller, asset, &self.staged)?;
            updates.push((asset, balance, allowance));
        }
        for (asset, balance, allowance) in updates {
            accounts.balances.insert((self.caller, asset), balance);
            accounts.allowances.insert((self.caller, asset), allowance);
        }
        debug!(caller = ?self.caller, entries = self.staged.len(), "[LEDGER] settlement committed");
        Ok(())
    }
}
