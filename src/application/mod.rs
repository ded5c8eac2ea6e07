//! Application layer containing the core business logic orchestration.
//!
//! `TransferEngine` performs the atomic read-check-mutate-log sequence,
//! `Ledger` wraps it with account creation and queries, and `Replayer` drives
//! a `Ledger` from a stream of commands.

pub mod engine;
pub mod ledger;
pub mod replay;
