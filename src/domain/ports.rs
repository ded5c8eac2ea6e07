use super::account::{Account, AccountId, Balance};
use super::transfer::{NewTransferRecord, TransferRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable holder of account balances and of the transfer audit log.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account. Fails with `DuplicateAccount` if the id is taken.
    async fn create_account(&self, account: Account) -> Result<Account>;

    /// Returns the latest committed state of an account, if it exists.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// All accounts ordered by id.
    async fn all_accounts(&self) -> Result<Vec<Account>>;

    /// The audit log ordered by record id.
    async fn transfer_records(&self) -> Result<Vec<TransferRecord>>;

    /// Opens an atomic unit of work over this store.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

/// An atomic, isolated group of account mutations.
///
/// Rows are locked with [`lock_account`](UnitOfWork::lock_account) in
/// strictly ascending id order. Writes are staged and only become visible,
/// all at once, on [`commit`](UnitOfWork::commit). Dropping a unit of work
/// without committing rolls it back and releases its locks.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Acquires exclusive access to an account row and returns its committed
    /// balance, or `None` if the account does not exist.
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Balance>>;

    /// Stages a new balance for a row locked by this unit of work.
    fn stage_balance(&mut self, id: AccountId, balance: Balance) -> Result<()>;

    /// Stages an audit record to be appended on commit.
    fn stage_transfer(&mut self, record: NewTransferRecord);

    /// Publishes every staged write atomically and returns the committed
    /// audit records.
    async fn commit(self: Box<Self>) -> Result<Vec<TransferRecord>>;
}

/// Shared, injected handle to a store.
pub type AccountStoreHandle = Arc<dyn AccountStore>;
