use super::engine::{TransferEngine, TransferPolicy};
use crate::domain::account::{Account, AccountId, Balance};
use crate::domain::ports::AccountStoreHandle;
use crate::domain::transfer::TransferRecord;
use crate::error::Result;
use rust_decimal::Decimal;
use tokio::time::Instant;

/// The ledger's public contract: account creation, balance queries and
/// transfers over one injected store.
///
/// `Ledger` is cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct Ledger {
    store: AccountStoreHandle,
    engine: TransferEngine,
}

impl Ledger {
    pub fn new(store: AccountStoreHandle, policy: TransferPolicy) -> Self {
        let engine = TransferEngine::new(store.clone(), policy);
        Self { store, engine }
    }

    /// Creates an account holding `initial_balance`.
    ///
    /// Fails with `InvalidArgument` for a non-positive id or a negative (or
    /// over-precise) balance, and with `DuplicateAccount` if the id exists.
    #[tracing::instrument(skip(self, initial_balance), fields(initial_balance = %initial_balance))]
    pub async fn create_account(&self, id: i64, initial_balance: Decimal) -> Result<Account> {
        let account = Account::new(AccountId::new(id)?, Balance::new(initial_balance)?);
        let created = self.store.create_account(account).await?;
        tracing::info!(balance = %created.balance, "account created");
        Ok(created)
    }

    /// Returns the latest committed state of an account, or `None`.
    pub async fn get_account(&self, id: i64) -> Result<Option<Account>> {
        self.store.get_account(AccountId::new(id)?).await
    }

    pub async fn transfer(
        &self,
        source_id: i64,
        destination_id: i64,
        amount: Decimal,
    ) -> Result<TransferRecord> {
        self.engine.transfer(source_id, destination_id, amount).await
    }

    pub async fn transfer_before(
        &self,
        source_id: i64,
        destination_id: i64,
        amount: Decimal,
        deadline: Instant,
    ) -> Result<TransferRecord> {
        self.engine
            .transfer_before(source_id, destination_id, amount, deadline)
            .await
    }

    /// Every account, ordered by id.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.store.all_accounts().await
    }

    /// The transfer audit log, ordered by record id.
    pub async fn transfer_log(&self) -> Result<Vec<TransferRecord>> {
        self.store.transfer_records().await
    }
}
