//! In-memory store.
//!
//! Sessions are serialized: `begin` takes an owned lock on the whole state and
//! works on a staged copy that replaces the state on commit. That gives every
//! session the isolation and atomicity the services rely on, at the cost of
//! any concurrency.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use billfold_shared::types::{AccountId, InvoiceId, NoteId, PartyId, QuoteId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, StoreError, StoreResult, StoreSession};
use crate::account::{Account, AccountKind, Transaction};
use crate::numbering::SequenceKey;
use crate::party::{
    Invoice, Note, NoteStatus, Party, PartyKind, PaymentStatus, PurchaseOrder, Quote,
    QuoteStatus,
};
use crate::payment::Payment;

#[derive(Debug, Clone, Default)]
struct State {
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    parties: Vec<Party>,
    invoices: Vec<Invoice>,
    notes: Vec<Note>,
    quotes: Vec<Quote>,
    payments: Vec<Payment>,
    purchase_orders: Vec<PurchaseOrder>,
    sequences: HashMap<SequenceKey, u64>,
}

/// Store keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Session over an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemorySession {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    type Session = InMemorySession;

    async fn begin(&self) -> StoreResult<InMemorySession> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = (*guard).clone();
        Ok(InMemorySession { guard, staged })
    }
}

fn missing(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{what} {id} does not exist"))
}

fn overflow(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{what} {id} amount out of range"))
}

impl InMemorySession {
    fn party_mut(&mut self, id: PartyId) -> StoreResult<&mut Party> {
        self.staged
            .parties
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing("party", id))
    }
}

#[async_trait]
impl StoreSession for InMemorySession {
    async fn lock_account(
        &mut self,
        owner: UserId,
        kind: AccountKind,
    ) -> StoreResult<Option<Account>> {
        Ok(self
            .staged
            .accounts
            .iter()
            .find(|a| a.owner == owner && a.kind == kind)
            .cloned())
    }

    async fn insert_account(&mut self, account: &Account) -> StoreResult<()> {
        if self
            .staged
            .accounts
            .iter()
            .any(|a| a.owner == account.owner && a.kind == account.kind)
        {
            return Err(StoreError::UniqueViolation(format!(
                "{} account for user {}",
                account.kind, account.owner
            )));
        }
        self.staged.accounts.push(account.clone());
        Ok(())
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> StoreResult<bool> {
        match self.insert_account(account).await {
            Ok(()) => Ok(true),
            Err(StoreError::UniqueViolation(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn adjust_account_balance(
        &mut self,
        id: AccountId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Decimal>> {
        let account = self
            .staged
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| missing("account", id))?;
        let balance = account
            .balance
            .checked_add(delta)
            .ok_or_else(|| overflow("account", id))?;
        if balance < Decimal::ZERO {
            return Ok(None);
        }
        account.balance = balance;
        account.last_updated = at;
        Ok(Some(balance))
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        self.staged.transactions.push(transaction.clone());
        Ok(())
    }

    async fn transactions(&mut self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .staged
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn insert_party(&mut self, party: &Party) -> StoreResult<()> {
        if self
            .staged
            .parties
            .iter()
            .any(|p| p.kind == party.kind && p.tax_id == party.tax_id)
        {
            return Err(StoreError::UniqueViolation(format!(
                "{} tax id {}",
                party.kind, party.tax_id
            )));
        }
        self.staged.parties.push(party.clone());
        Ok(())
    }

    async fn lock_party(&mut self, owner: UserId, id: PartyId) -> StoreResult<Option<Party>> {
        Ok(self
            .staged
            .parties
            .iter()
            .find(|p| p.id == id && p.owner == owner)
            .cloned())
    }

    async fn parties(&mut self, owner: UserId, kind: PartyKind) -> StoreResult<Vec<Party>> {
        let mut parties: Vec<Party> = self
            .staged
            .parties
            .iter()
            .filter(|p| p.owner == owner && p.kind == kind)
            .cloned()
            .collect();
        parties.sort_by(|a, b| a.business_name.cmp(&b.business_name));
        Ok(parties)
    }

    async fn update_party_details(&mut self, party: &Party) -> StoreResult<()> {
        let stored = self.party_mut(party.id)?;
        stored.business_name.clone_from(&party.business_name);
        stored.fantasy_name.clone_from(&party.fantasy_name);
        stored.credit_limit = party.credit_limit;
        Ok(())
    }

    async fn set_party_active(&mut self, id: PartyId, active: bool) -> StoreResult<()> {
        self.party_mut(id)?.is_active = active;
        Ok(())
    }

    async fn adjust_party_balance(
        &mut self,
        id: PartyId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Decimal> {
        let party = self.party_mut(id)?;
        party.balance.current = party
            .balance
            .current
            .checked_add(delta)
            .ok_or_else(|| overflow("party", id))?;
        party.balance.last_update = Some(at);
        Ok(party.balance.current)
    }

    async fn set_party_balance(
        &mut self,
        id: PartyId,
        value: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let party = self.party_mut(id)?;
        party.balance.current = value;
        party.balance.last_update = Some(at);
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        if self
            .staged
            .invoices
            .iter()
            .any(|i| i.party_id == invoice.party_id && i.invoice_number == invoice.invoice_number)
        {
            return Err(StoreError::UniqueViolation(format!(
                "invoice number {}",
                invoice.invoice_number
            )));
        }
        self.staged.invoices.push(invoice.clone());
        Ok(())
    }

    async fn invoices(&mut self, party_id: PartyId) -> StoreResult<Vec<Invoice>> {
        Ok(self
            .staged
            .invoices
            .iter()
            .filter(|i| i.party_id == party_id)
            .cloned()
            .collect())
    }

    async fn apply_invoice_payment(
        &mut self,
        id: InvoiceId,
        amount: Decimal,
    ) -> StoreResult<Option<Invoice>> {
        let Some(invoice) = self
            .staged
            .invoices
            .iter_mut()
            .find(|i| i.id == id && i.payment_status != PaymentStatus::Paid)
        else {
            return Ok(None);
        };
        invoice.amount_paid = invoice
            .amount_paid
            .checked_add(amount)
            .ok_or_else(|| overflow("invoice", id))?;
        invoice.payment_status = PaymentStatus::after_payment(invoice.total, invoice.amount_paid);
        Ok(Some(invoice.clone()))
    }

    async fn insert_note(&mut self, note: &Note) -> StoreResult<()> {
        if self
            .staged
            .notes
            .iter()
            .any(|n| n.party_id == note.party_id && n.note_number == note.note_number)
        {
            return Err(StoreError::UniqueViolation(format!(
                "note number {}",
                note.note_number
            )));
        }
        self.staged.notes.push(note.clone());
        Ok(())
    }

    async fn notes(&mut self, party_id: PartyId) -> StoreResult<Vec<Note>> {
        Ok(self
            .staged
            .notes
            .iter()
            .filter(|n| n.party_id == party_id)
            .cloned()
            .collect())
    }

    async fn transition_note(
        &mut self,
        id: NoteId,
        from: NoteStatus,
        to: NoteStatus,
    ) -> StoreResult<Option<Note>> {
        Ok(self
            .staged
            .notes
            .iter_mut()
            .find(|n| n.id == id && n.status == from)
            .map(|note| {
                note.status = to;
                note.clone()
            }))
    }

    async fn insert_quote(&mut self, quote: &Quote) -> StoreResult<()> {
        if self
            .staged
            .quotes
            .iter()
            .any(|q| q.party_id == quote.party_id && q.quote_number == quote.quote_number)
        {
            return Err(StoreError::UniqueViolation(format!(
                "quote number {}",
                quote.quote_number
            )));
        }
        self.staged.quotes.push(quote.clone());
        Ok(())
    }

    async fn quotes(&mut self, party_id: PartyId) -> StoreResult<Vec<Quote>> {
        Ok(self
            .staged
            .quotes
            .iter()
            .filter(|q| q.party_id == party_id)
            .cloned()
            .collect())
    }

    async fn transition_quote(
        &mut self,
        id: QuoteId,
        from: QuoteStatus,
        to: QuoteStatus,
        invoice_id: Option<InvoiceId>,
    ) -> StoreResult<Option<Quote>> {
        Ok(self
            .staged
            .quotes
            .iter_mut()
            .find(|q| q.id == id && q.status == from)
            .map(|quote| {
                quote.status = to;
                if invoice_id.is_some() {
                    quote.invoice_id = invoice_id;
                }
                quote.clone()
            }))
    }

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        if self
            .staged
            .payments
            .iter()
            .any(|p| p.party_id == payment.party_id && p.payment_number == payment.payment_number)
        {
            return Err(StoreError::UniqueViolation(format!(
                "payment number {}",
                payment.payment_number
            )));
        }
        self.staged.payments.push(payment.clone());
        Ok(())
    }

    async fn payments(&mut self, party_id: PartyId) -> StoreResult<Vec<Payment>> {
        Ok(self
            .staged
            .payments
            .iter()
            .filter(|p| p.party_id == party_id)
            .cloned()
            .collect())
    }

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        if self
            .staged
            .purchase_orders
            .iter()
            .any(|o| o.party_id == order.party_id && o.order_number == order.order_number)
        {
            return Err(StoreError::UniqueViolation(format!(
                "purchase order number {}",
                order.order_number
            )));
        }
        self.staged.purchase_orders.push(order.clone());
        Ok(())
    }

    async fn purchase_orders(&mut self, party_id: PartyId) -> StoreResult<Vec<PurchaseOrder>> {
        Ok(self
            .staged
            .purchase_orders
            .iter()
            .filter(|o| o.party_id == party_id)
            .cloned()
            .collect())
    }

    async fn next_sequence(&mut self, key: SequenceKey) -> StoreResult<u64> {
        let counter = self.staged.sequences.entry(key).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn commit(self) -> StoreResult<()> {
        let Self { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbering::DocumentKind;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let account = Account::open(owner, AccountKind::Cash, None, Utc::now());

        let mut session = store.begin().await.unwrap();
        session.insert_account(&account).await.unwrap();
        session.commit().await.unwrap();

        let mut session = store.begin().await.unwrap();
        let found = session.lock_account(owner, AccountKind::Cash).await.unwrap();
        assert_eq!(found, Some(account));
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let account = Account::open(owner, AccountKind::Bank, None, Utc::now());

        let mut session = store.begin().await.unwrap();
        session.insert_account(&account).await.unwrap();
        session.rollback().await.unwrap();

        let mut session = store.begin().await.unwrap();
        assert!(session.lock_account(owner, AccountKind::Bank).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_session_discards_changes() {
        let store = InMemoryStore::new();
        let key = SequenceKey {
            party_id: PartyId::new(),
            kind: DocumentKind::Invoice,
        };

        {
            let mut session = store.begin().await.unwrap();
            assert_eq!(session.next_sequence(key).await.unwrap(), 1);
        }

        let mut session = store.begin().await.unwrap();
        assert_eq!(session.next_sequence(key).await.unwrap(), 1);
        assert_eq!(session.next_sequence(key).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_account_rejected() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let mut session = store.begin().await.unwrap();
        session
            .insert_account(&Account::open(owner, AccountKind::Cash, None, Utc::now()))
            .await
            .unwrap();
        let result = session
            .insert_account(&Account::open(owner, AccountKind::Cash, None, Utc::now()))
            .await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn test_balance_never_goes_negative() {
        let store = InMemoryStore::new();
        let account = Account::open(UserId::new(), AccountKind::Cash, None, Utc::now());
        let mut session = store.begin().await.unwrap();
        session.insert_account(&account).await.unwrap();

        let now = Utc::now();
        assert_eq!(
            session.adjust_account_balance(account.id, dec!(100), now).await.unwrap(),
            Some(dec!(100))
        );
        assert_eq!(
            session.adjust_account_balance(account.id, dec!(-150), now).await.unwrap(),
            None
        );
        assert_eq!(
            session.adjust_account_balance(account.id, dec!(-100), now).await.unwrap(),
            Some(dec!(0))
        );
    }

    #[tokio::test]
    async fn test_balance_overflow_is_an_error() {
        let store = InMemoryStore::new();
        let mut account = Account::open(UserId::new(), AccountKind::Cash, None, Utc::now());
        account.balance = Decimal::MAX;
        let mut session = store.begin().await.unwrap();
        session.insert_account(&account).await.unwrap();

        let result = session
            .adjust_account_balance(account.id, dec!(1), Utc::now())
            .await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        let found = session.lock_account(account.owner, AccountKind::Cash).await.unwrap();
        assert_eq!(found.map(|a| a.balance), Some(Decimal::MAX));
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_existing_account() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let first = Account::open(owner, AccountKind::Bank, None, Utc::now());
        let second = Account::open(owner, AccountKind::Bank, None, Utc::now());

        let mut session = store.begin().await.unwrap();
        assert!(session.insert_account_if_absent(&first).await.unwrap());
        assert!(!session.insert_account_if_absent(&second).await.unwrap());
        let found = session.lock_account(owner, AccountKind::Bank).await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(first.id));
    }
}
