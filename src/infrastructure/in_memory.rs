use super::row_locks::{LockSet, RowLocks};
use crate::domain::account::{Account, AccountId, Balance};
use crate::domain::ports::{AccountStore, UnitOfWork};
use crate::domain::transfer::{NewTransferRecord, TransferRecord};
use crate::error::{LedgerError, Result, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Balance>,
    transfers: Vec<TransferRecord>,
}

/// A thread-safe in-memory ledger store.
///
/// Committed state lives behind a single `RwLock`: readers take the read side,
/// and a commit publishes all of its writes under one write-side critical
/// section, so no reader can see half of a transfer. Row exclusivity for
/// transfers is handled separately by [`RowLocks`], which lets transfers on
/// disjoint accounts proceed without waiting on each other until commit.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    state: Arc<RwLock<LedgerState>>,
    rows: RowLocks,
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create_account(&self, account: Account) -> Result<Account> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            return Err(LedgerError::DuplicateAccount(account.id));
        }
        state.accounts.insert(account.id, account.balance);
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .get(&id)
            .map(|balance| Account::new(id, *balance)))
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .map(|(id, balance)| Account::new(*id, *balance))
            .collect())
    }

    async fn transfer_records(&self) -> Result<Vec<TransferRecord>> {
        let state = self.state.read().await;
        Ok(state.transfers.clone())
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            state: self.state.clone(),
            locks: LockSet::new(self.rows.clone()),
            balances: BTreeMap::new(),
            transfers: Vec::new(),
        }))
    }
}

struct InMemoryUnitOfWork {
    state: Arc<RwLock<LedgerState>>,
    locks: LockSet,
    balances: BTreeMap<AccountId, Balance>,
    transfers: Vec<NewTransferRecord>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Balance>> {
        self.locks.acquire(id).await?;
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).copied())
    }

    fn stage_balance(&mut self, id: AccountId, balance: Balance) -> Result<()> {
        self.locks.ensure_held(id)?;
        self.balances.insert(id, balance);
        Ok(())
    }

    fn stage_transfer(&mut self, record: NewTransferRecord) {
        self.transfers.push(record);
    }

    async fn commit(self: Box<Self>) -> Result<Vec<TransferRecord>> {
        let mut state = self.state.write().await;

        // Validate everything before the first write so a rejected commit
        // leaves the state untouched.
        for id in self.balances.keys() {
            if !state.accounts.contains_key(id) {
                return Err(StorageError::ConstraintViolation(format!(
                    "balance staged for missing account {id}"
                ))
                .into());
            }
        }
        for record in &self.transfers {
            for id in [record.source, record.destination] {
                if !state.accounts.contains_key(&id) {
                    return Err(StorageError::ConstraintViolation(format!(
                        "transfer record references missing account {id}"
                    ))
                    .into());
                }
            }
        }

        for (id, balance) in &self.balances {
            state.accounts.insert(*id, *balance);
        }

        let created_at = Utc::now();
        let mut committed = Vec::with_capacity(self.transfers.len());
        for record in &self.transfers {
            let id = state.transfers.len() as u64 + 1;
            let record = record.into_record(id, created_at);
            state.transfers.push(record);
            committed.push(record);
        }

        Ok(committed)
    }
}
