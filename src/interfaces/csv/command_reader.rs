use crate::application::replay::LedgerCommand;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use thiserror::Error;

/// Why a command row could not be turned into a [`LedgerCommand`].
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Invalid(#[from] LedgerError),
}

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Open,
    Transfer,
    Balance,
}

/// One raw row of a command file: `type, account, counterparty, amount`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub account: i64,
    pub counterparty: Option<i64>,
    pub amount: Option<Decimal>,
}

impl TryFrom<CommandRecord> for LedgerCommand {
    type Error = LedgerError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        match record.r#type {
            CommandType::Open => Ok(LedgerCommand::Open {
                account: record.account,
                initial_balance: record
                    .amount
                    .ok_or_else(|| LedgerError::invalid("initial_balance is required"))?,
            }),
            CommandType::Transfer => Ok(LedgerCommand::Transfer {
                source: record.account,
                destination: record.counterparty.ok_or_else(|| {
                    LedgerError::invalid("destination_account_id is required")
                })?,
                amount: record
                    .amount
                    .ok_or_else(|| LedgerError::invalid("amount is required"))?,
            }),
            CommandType::Balance => Ok(LedgerCommand::Balance {
                account: record.account,
            }),
        }
    }
}

/// Reads ledger commands from a CSV source.
///
/// Whitespace around fields is trimmed and trailing empty columns may be
/// omitted.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts commands, one `Result` per row.
    pub fn commands(self) -> impl Iterator<Item = Result<LedgerCommand, ReadError>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|result| -> Result<LedgerCommand, ReadError> {
                Ok(LedgerCommand::try_from(result?)?)
            })
    }
}
