//! Core business logic for Billfold.
//!
//! This crate contains the ledger and balance logic with ZERO web or database
//! dependencies. Persistence is reached through the [`store`] traits; the
//! `billfold-db` crate provides the PostgreSQL implementation and
//! [`store::InMemoryStore`] serves tests and embedders.
//!
//! # Modules
//!
//! - `account` - Cash and bank accounts with append-only transaction logs
//! - `party` - Clients, suppliers, their documents and running balances
//! - `payment` - Payment reconciliation against invoices and accounts
//! - `numbering` - Sequential document numbers
//! - `store` - Storage session traits and the in-memory store
//! - `error` / `outcome` - Error taxonomy and the caller-facing result envelope

pub mod account;
pub mod error;
pub mod numbering;
pub mod outcome;
pub mod party;
pub mod payment;
pub mod store;

pub use error::{ErrorKind, LedgerError};
pub use outcome::Outcome;
