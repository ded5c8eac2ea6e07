use clap::Parser;
use ledger::application::ledger::Ledger;
use ledger::application::replay::Replayer;
use ledger::config::LedgerConfig;
use ledger::domain::ports::AccountStoreHandle;
use ledger::infrastructure::in_memory::InMemoryAccountStore;
use ledger::interfaces::csv::account_writer::AccountWriter;
use ledger::interfaces::csv::command_reader::CommandReader;
use ledger::interfaces::csv::transfer_log_writer::TransferLogWriter;
use ledger::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file (`type, account, counterparty, amount`)
    input: PathBuf,

    /// Write the transfer audit log as CSV to this path.
    #[arg(long)]
    transfer_log: Option<PathBuf>,

    #[command(flatten)]
    config: LedgerConfig,
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<&Path>) -> Result<AccountStoreHandle> {
    use ledger::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using rocksdb storage");
            Ok(Arc::new(RocksDBStore::open(path).into_diagnostic()?))
        }
        None => Ok(Arc::new(InMemoryAccountStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<&Path>) -> Result<AccountStoreHandle> {
    if db_path.is_some() {
        tracing::warn!(
            "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
        );
    }
    Ok(Arc::new(InMemoryAccountStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.config.log_format);

    let store = open_store(cli.config.db_path.as_deref())?;
    let ledger = Ledger::new(store, cli.config.transfer_policy());

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut replayer = Replayer::new(ledger.clone(), cli.config.workers());
    for (index, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => replayer.submit(command).await,
            Err(e) => tracing::warn!(row = index + 1, error = %e, "error reading command"),
        }
    }
    let summary = replayer.finish().await;
    tracing::info!(
        applied = summary.applied,
        rejected = summary.rejected,
        "replay finished"
    );

    let accounts = ledger.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    if let Some(path) = cli.transfer_log {
        let file = File::create(path).into_diagnostic()?;
        TransferLogWriter::new(file)
            .write_records(ledger.transfer_log().await.into_diagnostic()?)
            .into_diagnostic()?;
    }

    Ok(())
}
