//! CSV adapters for the command-line replayer.

pub mod account_writer;
pub mod command_reader;
pub mod transfer_log_writer;
