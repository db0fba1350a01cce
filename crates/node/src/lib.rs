//! Wallet node over the purse ledger.
//!
//! Wires the ledger, settlement engine and rate source together and
//! exposes them over HTTP. The router lives in [`api`] so integration
//! tests can drive it without binding a socket.

pub mod api;
pub mod config;
