//! `SeaORM` entities, one module per table.
//!
//! Enumerations are stored as their `as_str` text; line items and payment
//! allocations as JSONB.

pub mod account_transactions;
pub mod accounts;
pub mod document_sequences;
pub mod invoices;
pub mod notes;
pub mod parties;
pub mod payments;
pub mod purchase_orders;
pub mod quotes;
