use super::row_locks::{LockSet, RowLocks};
use crate::domain::account::{Account, AccountId, Balance};
use crate::domain::ports::{AccountStore, UnitOfWork};
use crate::domain::transfer::{NewTransferRecord, TransferRecord};
use crate::error::{LedgerError, Result, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing account rows.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for storing the transfer audit log.
pub const CF_TRANSFERS: &str = "transfers";

/// A persistent store implementation using RocksDB.
///
/// Accounts and transfer records live in separate Column Families. Row
/// exclusivity comes from an in-process [`RowLocks`] table (RocksDB is an
/// embedded, single-process database) and every commit is one `WriteBatch`,
/// which RocksDB applies atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    rows: RowLocks,
    /// Serialises account creation so the existence check and insert are atomic.
    creation: Arc<Mutex<()>>,
    /// Next transfer record id; held across the batch write so ids land in order.
    sequence: Arc<Mutex<u64>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the transfer
    /// sequence after the highest stored record id.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_transfers = ColumnFamilyDescriptor::new(CF_TRANSFERS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_accounts, cf_transfers])?;

        let next_id = {
            let cf = column_family(&db, CF_TRANSFERS)?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    transfer_id_from_key(&key)? + 1
                }
                None => 1,
            }
        };
        tracing::debug!(next_transfer_id = next_id, "opened rocksdb store");

        Ok(Self {
            db: Arc::new(db),
            rows: RowLocks::new(),
            creation: Arc::new(Mutex::new(())),
            sequence: Arc::new(Mutex::new(next_id)),
        })
    }

    fn read_account(&self, id: AccountId) -> Result<Option<Account>> {
        let cf = column_family(&self.db, CF_ACCOUNTS)?;
        match self.db.get_cf(cf, account_key(id))? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let cf = column_family(&self.db, name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(decode(&value)?);
        }
        Ok(rows)
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        StorageError::Corrupt(format!("column family {name} not found")).into()
    })
}

// Big-endian keys keep RocksDB's byte order equal to numeric order.
fn account_key(id: AccountId) -> [u8; 8] {
    id.value().to_be_bytes()
}

fn transfer_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn transfer_id_from_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| StorageError::Corrupt(format!("malformed transfer key {key:?}")))?;
    Ok(u64::from_be_bytes(bytes))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| StorageError::Corrupt(format!("serialization error: {e}")).into())
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| StorageError::Corrupt(format!("deserialization error: {e}")).into())
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn create_account(&self, account: Account) -> Result<Account> {
        let _creation = self.creation.lock().await;
        if self.read_account(account.id)?.is_some() {
            return Err(LedgerError::DuplicateAccount(account.id));
        }

        let cf = column_family(&self.db, CF_ACCOUNTS)?;
        self.db.put_cf(cf, account_key(account.id), encode(&account)?)?;
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.read_account(id)
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        self.scan(CF_ACCOUNTS)
    }

    async fn transfer_records(&self) -> Result<Vec<TransferRecord>> {
        self.scan(CF_TRANSFERS)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(RocksDBUnitOfWork {
            store: self.clone(),
            locks: LockSet::new(self.rows.clone()),
            balances: BTreeMap::new(),
            transfers: Vec::new(),
        }))
    }
}

struct RocksDBUnitOfWork {
    store: RocksDBStore,
    locks: LockSet,
    balances: BTreeMap<AccountId, Balance>,
    transfers: Vec<NewTransferRecord>,
}

#[async_trait]
impl UnitOfWork for RocksDBUnitOfWork {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Balance>> {
        self.locks.acquire(id).await?;
        Ok(self.store.read_account(id)?.map(|account| account.balance))
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
        let store = &self.store;
        let mut sequence = store.sequence.lock().await;

        let accounts_cf = column_family(&store.db, CF_ACCOUNTS)?;
        let transfers_cf = column_family(&store.db, CF_TRANSFERS)?;
        let mut batch = WriteBatch::default();

        for (id, balance) in &self.balances {
            if store.read_account(*id)?.is_none() {
                return Err(StorageError::ConstraintViolation(format!(
                    "balance staged for missing account {id}"
                ))
                .into());
            }
            batch.put_cf(
                accounts_cf,
                account_key(*id),
                encode(&Account::new(*id, *balance))?,
            );
        }

        let created_at = Utc::now();
        let mut next_id = *sequence;
        let mut committed = Vec::with_capacity(self.transfers.len());
        for record in &self.transfers {
            for id in [record.source, record.destination] {
                if store.read_account(id)?.is_none() {
                    return Err(StorageError::ConstraintViolation(format!(
                        "transfer record references missing account {id}"
                    ))
                    .into());
                }
            }
            let record = record.into_record(next_id, created_at);
            batch.put_cf(transfers_cf, transfer_key(next_id), encode(&record)?);
            committed.push(record);
            next_id += 1;
        }

        store.db.write(batch)?;
        *sequence = next_id;
        Ok(committed)
    }
}
