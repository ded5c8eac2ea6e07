use super::account::{AccountId, Amount, Balance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a transfer an account plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Source,
    Destination,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRole::Source => f.write_str("source"),
            AccountRole::Destination => f.write_str("destination"),
        }
    }
}

/// Progress of a single transfer attempt.
///
/// An attempt moves forward through the phases in declaration order and ends
/// either in `Committed` or, from any phase before `Mutating`, in `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransferPhase {
    Validating,
    Locking,
    Reading,
    Checking,
    Mutating,
    Committed,
    Aborted,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferPhase::Validating => "validating",
            TransferPhase::Locking => "locking",
            TransferPhase::Reading => "reading",
            TransferPhase::Checking => "checking",
            TransferPhase::Mutating => "mutating",
            TransferPhase::Committed => "committed",
            TransferPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// An audit entry staged inside a unit of work, before the store has assigned
/// its sequence number and commit timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransferRecord {
    pub source: AccountId,
    pub destination: AccountId,
    pub source_balance_before: Balance,
    pub destination_balance_before: Balance,
    pub amount: Amount,
}

impl NewTransferRecord {
    pub fn into_record(self, id: u64, created_at: DateTime<Utc>) -> TransferRecord {
        TransferRecord {
            id,
            source: self.source,
            destination: self.destination,
            source_balance_before: self.source_balance_before,
            destination_balance_before: self.destination_balance_before,
            amount: self.amount,
            created_at,
        }
    }
}

/// Immutable audit log entry, one per committed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: u64,
    pub source: AccountId,
    pub destination: AccountId,
    pub source_balance_before: Balance,
    pub destination_balance_before: Balance,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}
