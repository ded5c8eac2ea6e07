use crate::domain::account::AccountId;
use crate::error::{Result, StorageError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};

type Row = Arc<RowMutex<()>>;

/// Table of per-account exclusive locks shared by every unit of work on a
/// store.
///
/// An entry exists only while some unit of work holds or waits for its row,
/// so the table never outgrows the number of transfers in flight.
#[derive(Default, Clone)]
pub struct RowLocks {
    rows: Arc<Mutex<HashMap<AccountId, Row>>>,
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    // Never held across an await.
    fn table(&self) -> MutexGuard<'_, HashMap<AccountId, Row>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row(&self, id: AccountId) -> Row {
        self.table().entry(id).or_default().clone()
    }

    /// Drops the entry for `id` if the table holds the last reference to it.
    ///
    /// Every other reference is cloned under the table lock, so a count of one
    /// seen here cannot grow again before the entry is removed.
    fn release(&self, id: AccountId) {
        let mut rows = self.table();
        if rows.get(&id).is_some_and(|row| Arc::strong_count(row) == 1) {
            rows.remove(&id);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }
}

/// Exclusive hold on one row. Dropping it unlocks the row and retires the
/// row's table entry once nobody else needs it.
struct RowGuard {
    id: AccountId,
    table: RowLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.table.release(self.id);
    }
}

/// Row locks held by one unit of work.
///
/// Locks must be acquired in strictly ascending account id order. Two units of
/// work that need the same pair of rows therefore always contend on the lower
/// id first, so neither can hold one row while waiting for the other.
pub struct LockSet {
    table: RowLocks,
    held: Vec<RowGuard>,
}

impl LockSet {
    pub fn new(table: RowLocks) -> Self {
        Self {
            table,
            held: Vec::new(),
        }
    }

    pub async fn acquire(&mut self, id: AccountId) -> Result<()> {
        if let Some(last) = self.held.last()
            && last.id >= id
        {
            return Err(StorageError::LockOrder {
                held: last.id,
                requested: id,
            }
            .into());
        }

        // Declared before the wait so that a cancelled acquire still retires
        // the entry once the pending lock future is gone.
        let mut row_guard = RowGuard {
            id,
            table: self.table.clone(),
            guard: None,
        };
        row_guard.guard = Some(self.table.row(id).lock_owned().await);
        self.held.push(row_guard);
        Ok(())
    }

    pub fn holds(&self, id: AccountId) -> bool {
        self.held.iter().any(|held| held.id == id)
    }

    pub fn ensure_held(&self, id: AccountId) -> Result<()> {
        if self.holds(id) {
            Ok(())
        } else {
            Err(StorageError::NotLocked(id).into())
        }
    }
}
