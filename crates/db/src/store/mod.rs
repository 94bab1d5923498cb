//! PostgreSQL implementation of the core store traits.
//!
//! A [`PgSession`] wraps one database transaction. Row locks are taken with
//! `SELECT ... FOR UPDATE` and every balance change is a single
//! `UPDATE ... SET balance = balance + $delta` statement, so concurrent
//! sessions never lose each other's writes.

mod convert;

use async_trait::async_trait;
use billfold_core::account::{Account, AccountKind, Transaction};
use billfold_core::numbering::SequenceKey;
use billfold_core::party::{
    Invoice, Note, NoteStatus, Party, PartyKind, PaymentStatus, PurchaseOrder, Quote,
    QuoteStatus,
};
use billfold_core::payment::Payment;
use billfold_core::store::{LedgerStore, StoreError, StoreResult, StoreSession};
use billfold_shared::types::{AccountId, InvoiceId, NoteId, PartyId, QuoteId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, Statement,
    TransactionTrait,
};
use tracing::debug;

use crate::entities::{
    account_transactions, accounts, invoices, notes, parties, payments, purchase_orders, quotes,
};

const NEXT_SEQUENCE_SQL: &str = r"
INSERT INTO document_sequences (scope_id, kind, last_value)
VALUES ($1, $2, 1)
ON CONFLICT (scope_id, kind)
DO UPDATE SET last_value = document_sequences.last_value + 1
RETURNING last_value
";

/// Maps a database error onto the store taxonomy.
fn store_err(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return StoreError::UniqueViolation(detail);
    }

    let message = err.to_string();
    if message.contains("40001")
        || message.contains("could not serialize")
        || message.contains("deadlock")
    {
        StoreError::Conflict(message)
    } else {
        StoreError::Backend(message)
    }
}

fn missing(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{what} {id} does not exist"))
}

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store over an established connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Session = PgSession;

    async fn begin(&self) -> StoreResult<PgSession> {
        let txn = self.db.begin().await.map_err(store_err)?;
        Ok(PgSession { txn })
    }
}

/// One database transaction.
///
/// Dropping the session without committing rolls it back.
pub struct PgSession {
    txn: DatabaseTransaction,
}

impl std::fmt::Debug for PgSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSession").finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreSession for PgSession {
    // ========== Accounts ==========

    async fn lock_account(
        &mut self,
        owner: UserId,
        kind: AccountKind,
    ) -> StoreResult<Option<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner.into_inner()))
            .filter(accounts::Column::Kind.eq(kind.as_str()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_err)?
            .map(convert::account)
            .transpose()
    }

    async fn insert_account(&mut self, account: &Account) -> StoreResult<()> {
        convert::account_model(account)
            .insert(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> StoreResult<bool> {
        let inserted = accounts::Entity::insert(convert::account_model(account))
            .on_conflict(
                OnConflict::columns([accounts::Column::OwnerId, accounts::Column::Kind])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(inserted > 0)
    }

    async fn adjust_account_balance(
        &mut self,
        id: AccountId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Decimal>> {
        let updated = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(delta),
            )
            .col_expr(accounts::Column::LastUpdated, Expr::value(at))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .filter(Expr::expr(Expr::col(accounts::Column::Balance).add(delta)).gte(Decimal::ZERO))
            .exec_with_returning(&self.txn)
            .await
            .map_err(store_err)?;

        if updated.is_empty() {
            debug!(account_id = %id, %delta, "Balance change would overdraw account");
        }
        Ok(updated.into_iter().next().map(|model| model.balance))
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        convert::transaction_model(transaction)
            .insert(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn transactions(&mut self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        account_transactions::Entity::find()
            .filter(account_transactions::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(account_transactions::Column::Seq)
            .all(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::transaction)
            .collect()
    }

    // ========== Parties ==========

    async fn insert_party(&mut self, party: &Party) -> StoreResult<()> {
        convert::party_model(party)
            .insert(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn lock_party(&mut self, owner: UserId, id: PartyId) -> StoreResult<Option<Party>> {
        parties::Entity::find_by_id(id.into_inner())
            .filter(parties::Column::OwnerId.eq(owner.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_err)?
            .map(convert::party)
            .transpose()
    }

    async fn parties(&mut self, owner: UserId, kind: PartyKind) -> StoreResult<Vec<Party>> {
        parties::Entity::find()
            .filter(parties::Column::OwnerId.eq(owner.into_inner()))
            .filter(parties::Column::Kind.eq(kind.as_str()))
            .order_by_asc(parties::Column::BusinessName)
            .order_by_asc(parties::Column::CreatedAt)
            .all(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::party)
            .collect()
    }

    async fn update_party_details(&mut self, party: &Party) -> StoreResult<()> {
        let result = parties::Entity::update_many()
            .col_expr(
                parties::Column::BusinessName,
                Expr::value(party.business_name.clone()),
            )
            .col_expr(
                parties::Column::FantasyName,
                Expr::value(party.fantasy_name.clone()),
            )
            .col_expr(parties::Column::CreditLimit, Expr::value(party.credit_limit))
            .filter(parties::Column::Id.eq(party.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_err)?;

        if result.rows_affected == 0 {
            return Err(missing("party", party.id));
        }
        Ok(())
    }

    async fn set_party_active(&mut self, id: PartyId, active: bool) -> StoreResult<()> {
        let result = parties::Entity::update_many()
            .col_expr(parties::Column::IsActive, Expr::value(active))
            .filter(parties::Column::Id.eq(id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_err)?;

        if result.rows_affected == 0 {
            return Err(missing("party", id));
        }
        Ok(())
    }

    async fn adjust_party_balance(
        &mut self,
        id: PartyId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Decimal> {
        parties::Entity::update_many()
            .col_expr(
                parties::Column::Balance,
                Expr::col(parties::Column::Balance).add(delta),
            )
            .col_expr(parties::Column::BalanceUpdatedAt, Expr::value(at))
            .filter(parties::Column::Id.eq(id.into_inner()))
            .exec_with_returning(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .next()
            .map(|model| model.balance)
            .ok_or_else(|| missing("party", id))
    }

    async fn set_party_balance(
        &mut self,
        id: PartyId,
        value: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = parties::Entity::update_many()
            .col_expr(parties::Column::Balance, Expr::value(value))
            .col_expr(parties::Column::BalanceUpdatedAt, Expr::value(at))
            .filter(parties::Column::Id.eq(id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_err)?;

        if result.rows_affected == 0 {
            return Err(missing("party", id));
        }
        Ok(())
    }

    // ========== Invoices ==========

    async fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        convert::invoice_model(invoice)?
            .insert(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn invoices(&mut self, party_id: PartyId) -> StoreResult<Vec<Invoice>> {
        invoices::Entity::find()
            .filter(invoices::Column::PartyId.eq(party_id.into_inner()))
            .order_by_asc(invoices::Column::Seq)
            .all(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::invoice)
            .collect()
    }

    async fn apply_invoice_payment(
        &mut self,
        id: InvoiceId,
        amount: Decimal,
    ) -> StoreResult<Option<Invoice>> {
        let Some(model) = invoices::Entity::find_by_id(id.into_inner())
            .filter(invoices::Column::PaymentStatus.ne(PaymentStatus::Paid.as_str()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_err)?
        else {
            return Ok(None);
        };

        let amount_paid = model.amount_paid + amount;
        let status = PaymentStatus::after_payment(model.total, amount_paid);

        let mut active: invoices::ActiveModel = model.into();
        active.amount_paid = Set(amount_paid);
        active.payment_status = Set(status.as_str().to_string());
        let updated = active.update(&self.txn).await.map_err(store_err)?;

        convert::invoice(updated).map(Some)
    }

    // ========== Notes ==========

    async fn insert_note(&mut self, note: &Note) -> StoreResult<()> {
        convert::note_model(note)?
            .insert(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn notes(&mut self, party_id: PartyId) -> StoreResult<Vec<Note>> {
        notes::Entity::find()
            .filter(notes::Column::PartyId.eq(party_id.into_inner()))
            .order_by_asc(notes::Column::Seq)
            .all(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::note)
            .collect()
    }

    async fn transition_note(
        &mut self,
        id: NoteId,
        from: NoteStatus,
        to: NoteStatus,
    ) -> StoreResult<Option<Note>> {
        notes::Entity::update_many()
            .col_expr(notes::Column::Status, Expr::value(to.as_str()))
            .filter(notes::Column::Id.eq(id.into_inner()))
            .filter(notes::Column::Status.eq(from.as_str()))
            .exec_with_returning(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .next()
            .map(convert::note)
            .transpose()
    }

    // ========== Quotes ==========

    async fn insert_quote(&mut self, quote: &Quote) -> StoreResult<()> {
        convert::quote_model(quote)?
            .insert(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn quotes(&mut self, party_id: PartyId) -> StoreResult<Vec<Quote>> {
        quotes::Entity::find()
            .filter(quotes::Column::PartyId.eq(party_id.into_inner()))
            .order_by_asc(quotes::Column::Seq)
            .all(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::quote)
            .collect()
    }

    async fn transition_quote(
        &mut self,
        id: QuoteId,
        from: QuoteStatus,
        to: QuoteStatus,
        invoice_id: Option<InvoiceId>,
    ) -> StoreResult<Option<Quote>> {
        let mut update = quotes::Entity::update_many()
            .col_expr(quotes::Column::Status, Expr::value(to.as_str()));
        if let Some(invoice_id) = invoice_id {
            update = update.col_expr(
                quotes::Column::InvoiceId,
                Expr::value(invoice_id.into_inner()),
            );
        }

        update
            .filter(quotes::Column::Id.eq(id.into_inner()))
            .filter(quotes::Column::Status.eq(from.as_str()))
            .exec_with_returning(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .next()
            .map(convert::quote)
            .transpose()
    }

    // ========== Payments ==========

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        convert::payment_model(payment)?
            .insert(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn payments(&mut self, party_id: PartyId) -> StoreResult<Vec<Payment>> {
        payments::Entity::find()
            .filter(payments::Column::PartyId.eq(party_id.into_inner()))
            .order_by_asc(payments::Column::Seq)
            .all(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::payment)
            .collect()
    }

    // ========== Purchase Orders ==========

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        convert::purchase_order_model(order)?
            .insert(&self.txn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn purchase_orders(&mut self, party_id: PartyId) -> StoreResult<Vec<PurchaseOrder>> {
        purchase_orders::Entity::find()
            .filter(purchase_orders::Column::PartyId.eq(party_id.into_inner()))
            .order_by_asc(purchase_orders::Column::Seq)
            .all(&self.txn)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::purchase_order)
            .collect()
    }

    // ========== Sequences ==========

    async fn next_sequence(&mut self, key: SequenceKey) -> StoreResult<u64> {
        let row = self
            .txn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                NEXT_SEQUENCE_SQL,
                [key.party_id.into_inner().into(), key.kind.as_str().into()],
            ))
            .await
            .map_err(store_err)?
            .ok_or_else(|| StoreError::Backend("sequence upsert returned no row".to_string()))?;

        let value: i64 = row.try_get("", "last_value").map_err(store_err)?;
        u64::try_from(value).map_err(|e| StoreError::Backend(e.to_string()))
    }

    // ========== Session ==========

    async fn commit(self) -> StoreResult<()> {
        self.txn.commit().await.map_err(store_err)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.txn.rollback().await.map_err(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_failure_maps_to_conflict() {
        let err = DbErr::Custom(
            "error returned from database: could not serialize access due to concurrent update"
                .to_string(),
        );
        assert!(matches!(store_err(err), StoreError::Conflict(_)));
    }

    #[test]
    fn test_other_errors_map_to_backend() {
        let err = DbErr::Custom("connection refused".to_string());
        assert!(matches!(store_err(err), StoreError::Backend(_)));
    }
}
