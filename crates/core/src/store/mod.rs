//! Storage abstraction.
//!
//! A [`LedgerStore`] hands out [`StoreSession`]s. A session is one atomic unit
//! of work: everything done through it becomes visible on [`StoreSession::commit`]
//! and is discarded on [`StoreSession::rollback`] or drop.
//!
//! Sessions expose field-level operations only. Balances move through
//! `adjust_*` deltas and statuses through guarded transitions; there is no way
//! to write a whole party or account back, so two writers can never overwrite
//! each other's balance changes.

mod memory;

pub use memory::{InMemorySession, InMemoryStore};

use async_trait::async_trait;
use billfold_shared::types::{AccountId, InvoiceId, NoteId, PartyId, QuoteId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::account::{Account, AccountKind, Transaction};
use crate::error::LedgerError;
use crate::numbering::SequenceKey;
use crate::party::{
    Invoice, Note, NoteStatus, Party, PartyKind, PurchaseOrder, Quote, QuoteStatus,
};
use crate::payment::Payment;

/// Store faults.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The backend aborted the session because of a concurrent writer.
    #[error("concurrent update conflict: {0}")]
    Conflict(String),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Source of store sessions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Session type.
    type Session: StoreSession;

    /// Opens a session.
    async fn begin(&self) -> StoreResult<Self::Session>;
}

/// One atomic unit of work.
///
/// `lock_*` reads take a write lock on the row for the rest of the session.
/// Callers lock parties before accounts and the cash account before the bank
/// account.
#[async_trait]
pub trait StoreSession: Send {
    // ========== Accounts ==========

    /// Reads and locks the user's account of `kind`.
    async fn lock_account(
        &mut self,
        owner: UserId,
        kind: AccountKind,
    ) -> StoreResult<Option<Account>>;

    /// Inserts an account. Fails with `UniqueViolation` if the user already
    /// has one of that kind.
    async fn insert_account(&mut self, account: &Account) -> StoreResult<()>;

    /// Inserts an account unless the user already has one of that kind.
    /// Returns whether a row was written.
    async fn insert_account_if_absent(&mut self, account: &Account) -> StoreResult<bool>;

    /// Adds `delta` to the account balance and stamps `last_updated`.
    ///
    /// Returns the new balance, or `None` (changing nothing) when the result
    /// would be negative.
    async fn adjust_account_balance(
        &mut self,
        id: AccountId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Decimal>>;

    /// Appends a transaction to its account's log.
    async fn append_transaction(&mut self, transaction: &Transaction) -> StoreResult<()>;

    /// Returns an account's transactions, oldest first.
    async fn transactions(&mut self, account_id: AccountId) -> StoreResult<Vec<Transaction>>;

    // ========== Parties ==========

    /// Inserts a party. Fails with `UniqueViolation` on a duplicate tax id
    /// within the same party kind.
    async fn insert_party(&mut self, party: &Party) -> StoreResult<()>;

    /// Reads and locks a party owned by `owner`.
    async fn lock_party(&mut self, owner: UserId, id: PartyId) -> StoreResult<Option<Party>>;

    /// Returns every party of `kind` owned by `owner`, inactive ones
    /// included, ordered by business name.
    async fn parties(&mut self, owner: UserId, kind: PartyKind) -> StoreResult<Vec<Party>>;

    /// Writes the editable fields of `party` (names and credit limit).
    async fn update_party_details(&mut self, party: &Party) -> StoreResult<()>;

    /// Sets the soft-delete flag.
    async fn set_party_active(&mut self, id: PartyId, active: bool) -> StoreResult<()>;

    /// Adds `delta` to the party balance and returns the new value.
    async fn adjust_party_balance(
        &mut self,
        id: PartyId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Decimal>;

    /// Overwrites the party balance with a recomputed value.
    async fn set_party_balance(
        &mut self,
        id: PartyId,
        value: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    // ========== Invoices ==========

    /// Inserts an invoice. Fails with `UniqueViolation` on a duplicate number
    /// within the party.
    async fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()>;

    /// Returns a party's invoices, oldest first.
    async fn invoices(&mut self, party_id: PartyId) -> StoreResult<Vec<Invoice>>;

    /// Adds `amount` to the paid amount of an invoice that is not yet paid
    /// and moves its status to partial or paid.
    ///
    /// Returns `None` (changing nothing) if the invoice is missing or paid.
    async fn apply_invoice_payment(
        &mut self,
        id: InvoiceId,
        amount: Decimal,
    ) -> StoreResult<Option<Invoice>>;

    // ========== Notes ==========

    /// Inserts a note.
    async fn insert_note(&mut self, note: &Note) -> StoreResult<()>;

    /// Returns a party's notes, oldest first.
    async fn notes(&mut self, party_id: PartyId) -> StoreResult<Vec<Note>>;

    /// Moves a note from `from` to `to`. Returns `None` if it is not in `from`.
    async fn transition_note(
        &mut self,
        id: NoteId,
        from: NoteStatus,
        to: NoteStatus,
    ) -> StoreResult<Option<Note>>;

    // ========== Quotes ==========

    /// Inserts a quote.
    async fn insert_quote(&mut self, quote: &Quote) -> StoreResult<()>;

    /// Returns a party's quotes, oldest first.
    async fn quotes(&mut self, party_id: PartyId) -> StoreResult<Vec<Quote>>;

    /// Moves a quote from `from` to `to`, optionally stamping the invoice it
    /// became. Returns `None` if it is not in `from`.
    async fn transition_quote(
        &mut self,
        id: QuoteId,
        from: QuoteStatus,
        to: QuoteStatus,
        invoice_id: Option<InvoiceId>,
    ) -> StoreResult<Option<Quote>>;

    // ========== Payments ==========

    /// Inserts a payment.
    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()>;

    /// Returns a party's payments, oldest first.
    async fn payments(&mut self, party_id: PartyId) -> StoreResult<Vec<Payment>>;

    // ========== Purchase Orders ==========

    /// Inserts a purchase order. Fails with `UniqueViolation` on a duplicate
    /// order number within the party.
    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()>;

    /// Returns a party's purchase orders, oldest first.
    async fn purchase_orders(&mut self, party_id: PartyId) -> StoreResult<Vec<PurchaseOrder>>;

    // ========== Sequences ==========

    /// Increments the counter of `key` and returns the new value (1 for the
    /// first document).
    async fn next_sequence(&mut self, key: SequenceKey) -> StoreResult<u64>;

    // ========== Session ==========

    /// Makes every change of the session visible.
    async fn commit(self) -> StoreResult<()>;

    /// Discards every change of the session.
    async fn rollback(self) -> StoreResult<()>;
}

/// Commits `session` if `result` is `Ok`, rolls it back otherwise.
pub(crate) async fn finish<S, T>(session: S, result: Result<T, LedgerError>) -> Result<T, LedgerError>
where
    S: StoreSession,
{
    match result {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
