//! Ledger domain: value objects, audit records and the storage ports.

pub mod account;
pub mod ports;
pub mod transfer;
