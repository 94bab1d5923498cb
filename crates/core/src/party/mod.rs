//! Clients, suppliers and their documents.
//!
//! A party's balance is derived from its invoices and notes by
//! [`recompute_balance`] and stored for fast reads. Every document change
//! that affects it recomputes inside the same store session.

pub mod balance;
pub mod quote;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;

pub use balance::{can_create_invoice, check_credit_limit, recompute_balance};
pub use quote::Conversion;
pub use service::PartyService;
pub use types::{
    ConvertQuote, Invoice, InvoiceType, LineItem, NewInvoice, NewNote, NewParty,
    NewPurchaseOrder, NewQuote, NewSupplierInvoice, Note, NoteStatus, NoteType, Party,
    PartyBalance, PartyKind, PartyStatement, PartyUpdate, PaymentStatus, PurchaseOrder,
    PurchaseOrderStatus, Quote, QuoteStatus,
};
