#![allow(dead_code)]

use async_trait::async_trait;
use ledger::application::engine::TransferPolicy;
use ledger::application::ledger::Ledger;
use ledger::domain::account::{Account, AccountId, Balance};
use ledger::domain::ports::{AccountStore, UnitOfWork};
use ledger::domain::transfer::{NewTransferRecord, TransferRecord};
use ledger::error::{Result, StorageError};
use ledger::infrastructure::in_memory::InMemoryAccountStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::NamedTempFile;

pub async fn ledger_with(accounts: &[(i64, Decimal)]) -> Ledger {
    let ledger = Ledger::new(
        Arc::new(InMemoryAccountStore::new()),
        TransferPolicy::default(),
    );
    for (id, balance) in accounts {
        ledger.create_account(*id, *balance).await.unwrap();
    }
    ledger
}

pub async fn balance_of(ledger: &Ledger, id: i64) -> Decimal {
    ledger.get_account(id).await.unwrap().unwrap().balance.value()
}

pub async fn total_balance(ledger: &Ledger) -> Decimal {
    ledger
        .accounts()
        .await
        .unwrap()
        .iter()
        .map(|account| account.balance.value())
        .sum()
}

/// Writes a command file with the standard header followed by `rows`.
pub fn command_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "type, account, counterparty, amount").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// Generates two funded accounts followed by `transfers` alternating 1.00
/// transfers between them.
pub fn generate_commands(path: &Path, transfers: usize) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["type", "account", "counterparty", "amount"])?;
    wtr.write_record(["open", "1", "", "1000.00"])?;
    wtr.write_record(["open", "2", "", "1000.00"])?;

    for i in 0..transfers {
        let (source, destination) = if i % 2 == 0 { ("1", "2") } else { ("2", "1") };
        wtr.write_record(["transfer", source, destination, "1.00"])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Store wrapper whose commits fail with a transient conflict a set number of
/// times before succeeding.
#[derive(Clone)]
pub struct ConflictingStore {
    inner: InMemoryAccountStore,
    remaining_conflicts: Arc<AtomicU32>,
    begins: Arc<AtomicU32>,
}

impl ConflictingStore {
    pub fn new(inner: InMemoryAccountStore, conflicts: u32) -> Self {
        Self {
            inner,
            remaining_conflicts: Arc::new(AtomicU32::new(conflicts)),
            begins: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn begins(&self) -> u32 {
        self.begins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for ConflictingStore {
    async fn create_account(&self, account: Account) -> Result<Account> {
        self.inner.create_account(account).await
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.inner.get_account(id).await
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        self.inner.all_accounts().await
    }

    async fn transfer_records(&self) -> Result<Vec<TransferRecord>> {
        self.inner.transfer_records().await
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ConflictingUnitOfWork {
            inner: self.inner.begin().await?,
            remaining_conflicts: self.remaining_conflicts.clone(),
        }))
    }
}

struct ConflictingUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    remaining_conflicts: Arc<AtomicU32>,
}

#[async_trait]
impl UnitOfWork for ConflictingUnitOfWork {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Balance>> {
        self.inner.lock_account(id).await
    }

    fn stage_balance(&mut self, id: AccountId, balance: Balance) -> Result<()> {
        self.inner.stage_balance(id, balance)
    }

    fn stage_transfer(&mut self, record: NewTransferRecord) {
        self.inner.stage_transfer(record)
    }

    async fn commit(self: Box<Self>) -> Result<Vec<TransferRecord>> {
        let conflicted = self
            .remaining_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(StorageError::Conflict("write conflict".into()).into());
        }
        self.inner.commit().await
    }
}
