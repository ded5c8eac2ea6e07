use crate::domain::account::{Account, Balance};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow {
    account: i64,
    balance: Balance,
}

/// Writes final account balances as CSV (`account,balance`).
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts<I>(&mut self, accounts: I) -> csv::Result<()>
    where
        I: IntoIterator<Item = Account>,
    {
        let mut wrote_any = false;
        for account in accounts {
            self.writer.serialize(AccountRow {
                account: account.id.value(),
                balance: account.balance,
            })?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer.write_record(["account", "balance"])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
