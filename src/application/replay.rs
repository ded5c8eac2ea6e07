use super::ledger::Ledger;
use crate::domain::transfer::TransferRecord;
use crate::error::Result;
use rust_decimal::Decimal;
use tokio::task::JoinSet;

/// One instruction for the ledger, as read from a command file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerCommand {
    Open {
        account: i64,
        initial_balance: Decimal,
    },
    Transfer {
        source: i64,
        destination: i64,
        amount: Decimal,
    },
    Balance {
        account: i64,
    },
}

/// Counts of commands that took effect and commands the ledger refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

/// Applies commands to a [`Ledger`] in submission order.
///
/// With more than one worker, runs of consecutive transfers are executed
/// concurrently, at most `workers` at a time. Any other command waits for the
/// transfers in flight to finish before it runs, so an account is always
/// opened before the transfers that follow it.
pub struct Replayer {
    ledger: Ledger,
    workers: usize,
    in_flight: JoinSet<Result<TransferRecord>>,
    summary: ReplaySummary,
}

impl Replayer {
    pub fn new(ledger: Ledger, workers: usize) -> Self {
        Self {
            ledger,
            workers: workers.max(1),
            in_flight: JoinSet::new(),
            summary: ReplaySummary::default(),
        }
    }

    pub async fn submit(&mut self, command: LedgerCommand) {
        match command {
            LedgerCommand::Transfer {
                source,
                destination,
                amount,
            } if self.workers > 1 => {
                while self.in_flight.len() >= self.workers {
                    self.reap_one().await;
                }
                let ledger = self.ledger.clone();
                self.in_flight
                    .spawn(async move { ledger.transfer(source, destination, amount).await });
            }
            command => {
                self.drain().await;
                let outcome = self.apply(command).await;
                self.record(outcome);
            }
        }
    }

    /// Waits for every in-flight transfer and returns the final counts.
    pub async fn finish(mut self) -> ReplaySummary {
        self.drain().await;
        self.summary
    }

    async fn apply(&self, command: LedgerCommand) -> Result<()> {
        match command {
            LedgerCommand::Open {
                account,
                initial_balance,
            } => {
                self.ledger.create_account(account, initial_balance).await?;
            }
            LedgerCommand::Transfer {
                source,
                destination,
                amount,
            } => {
                self.ledger.transfer(source, destination, amount).await?;
            }
            LedgerCommand::Balance { account } => match self.ledger.get_account(account).await? {
                Some(found) => tracing::info!(account, balance = %found.balance, "balance"),
                None => tracing::info!(account, "account not found"),
            },
        }
        Ok(())
    }

    async fn drain(&mut self) {
        while !self.in_flight.is_empty() {
            self.reap_one().await;
        }
    }

    async fn reap_one(&mut self) {
        match self.in_flight.join_next().await {
            Some(Ok(outcome)) => self.record(outcome.map(|_| ())),
            Some(Err(e)) => {
                tracing::error!(error = %e, "transfer task failed");
                self.summary.rejected += 1;
            }
            None => {}
        }
    }

    fn record(&mut self, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.summary.applied += 1,
            Err(e) => {
                tracing::warn!(kind = %e.kind(), error = %e, "command rejected");
                self.summary.rejected += 1;
            }
        }
    }
}
