use crate::domain::account::{AccountId, Amount};
use crate::domain::ports::AccountStoreHandle;
use crate::domain::transfer::{AccountRole, NewTransferRecord, TransferPhase, TransferRecord};
use crate::error::{LedgerError, Result, StorageError};
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::time::Instant;

/// Limits applied to every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    /// Default time budget for a transfer, covering all of its attempts.
    pub deadline: Duration,
    /// Total attempts allowed when the store reports a transient conflict.
    pub max_attempts: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(5),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

/// A validated transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Amount,
}

impl TransferRequest {
    /// Checks the preconditions that can be decided without touching storage.
    pub fn new(source_id: i64, destination_id: i64, amount: Decimal) -> Result<Self> {
        let source = AccountId::new(source_id)
            .map_err(|_| LedgerError::invalid("source_account_id must be a positive integer"))?;
        let destination = AccountId::new(destination_id).map_err(|_| {
            LedgerError::invalid("destination_account_id must be a positive integer")
        })?;
        if source == destination {
            return Err(LedgerError::invalid(
                "source_account_id and destination_account_id cannot be the same",
            ));
        }
        let amount = Amount::new(amount)?;
        Ok(Self {
            source,
            destination,
            amount,
        })
    }

    /// Both account ids in lock acquisition order: lowest first, whatever its
    /// role in the transfer.
    fn lock_order(&self) -> [(AccountRole, AccountId); 2] {
        let source = (AccountRole::Source, self.source);
        let destination = (AccountRole::Destination, self.destination);
        if self.source < self.destination {
            [source, destination]
        } else {
            [destination, source]
        }
    }
}

/// Executes funds movements as atomic units of work against an injected store.
///
/// The engine keeps no mutable state of its own; clones share only the store
/// handle and may be used from any number of tasks at once.
#[derive(Clone)]
pub struct TransferEngine {
    store: AccountStoreHandle,
    policy: TransferPolicy,
}

impl TransferEngine {
    pub fn new(store: AccountStoreHandle, policy: TransferPolicy) -> Self {
        Self { store, policy }
    }

    /// Moves `amount` from `source_id` to `destination_id` within the
    /// policy's default deadline.
    pub async fn transfer(
        &self,
        source_id: i64,
        destination_id: i64,
        amount: Decimal,
    ) -> Result<TransferRecord> {
        let deadline = Instant::now() + self.policy.deadline;
        self.transfer_before(source_id, destination_id, amount, deadline)
            .await
    }

    /// Moves funds, giving up with `StorageFailure(Timeout)` once `deadline`
    /// passes while waiting for locks or for commit.
    #[tracing::instrument(
        name = "transfer",
        skip_all,
        fields(source = source_id, destination = destination_id, amount = %amount)
    )]
    pub async fn transfer_before(
        &self,
        source_id: i64,
        destination_id: i64,
        amount: Decimal,
        deadline: Instant,
    ) -> Result<TransferRecord> {
        let request = TransferRequest::new(source_id, destination_id, amount).inspect_err(|e| {
            tracing::warn!(phase = %TransferPhase::Validating, error = %e, "transfer rejected");
        })?;

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let mut phase = TransferPhase::Locking;
            let outcome = tokio::time::timeout_at(deadline, self.attempt(request, &mut phase))
                .await
                .unwrap_or_else(|_| Err(StorageError::Timeout.into()));

            match outcome {
                Ok(record) => {
                    tracing::info!(
                        record_id = record.id,
                        attempt,
                        "transfer committed"
                    );
                    return Ok(record);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(%phase, attempt, error = %e, "transient failure, retrying transfer");
                    let backoff = self.policy.retry_backoff * attempt;
                    if Instant::now() + backoff >= deadline {
                        tracing::warn!(%phase, attempt, "no time left to retry transfer");
                        return Err(StorageError::Timeout.into());
                    }
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        phase = %TransferPhase::Aborted,
                        failed_in = %phase,
                        attempt,
                        kind = %e.kind(),
                        error = %e,
                        "transfer aborted"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// One full read-check-mutate-log pass from a fresh unit of work.
    ///
    /// Returning early drops the unit of work, which rolls it back. `phase`
    /// is left at the phase in which the attempt stopped.
    async fn attempt(
        &self,
        request: TransferRequest,
        phase: &mut TransferPhase,
    ) -> Result<TransferRecord> {
        let mut uow = self.store.begin().await?;

        let mut source_balance = None;
        let mut destination_balance = None;
        for (role, id) in request.lock_order() {
            *phase = TransferPhase::Locking;
            let balance = uow.lock_account(id).await?;
            *phase = TransferPhase::Reading;
            match role {
                AccountRole::Source => source_balance = balance,
                AccountRole::Destination => destination_balance = balance,
            }
        }
        tracing::debug!(%phase, "both rows locked");

        *phase = TransferPhase::Checking;
        let source_balance = source_balance.ok_or(LedgerError::NotFound {
            side: AccountRole::Source,
            id: request.source,
        })?;
        let destination_balance = destination_balance.ok_or(LedgerError::NotFound {
            side: AccountRole::Destination,
            id: request.destination,
        })?;
        let debited = source_balance
            .debit(request.amount)
            .ok_or(LedgerError::InsufficientFunds {
                account: request.source,
                available: source_balance,
                requested: request.amount,
            })?;
        let credited = destination_balance.credit(request.amount)?;

        *phase = TransferPhase::Mutating;
        uow.stage_balance(request.source, debited)?;
        uow.stage_balance(request.destination, credited)?;
        uow.stage_transfer(NewTransferRecord {
            source: request.source,
            destination: request.destination,
            source_balance_before: source_balance,
            destination_balance_before: destination_balance,
            amount: request.amount,
        });

        let record = uow
            .commit()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::Corrupt("commit returned no transfer record".into()))?;
        *phase = TransferPhase::Committed;
        Ok(record)
    }
}
