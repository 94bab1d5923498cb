//! Party service: clients, suppliers, invoices, notes and purchase orders.
//!
//! Operations that change what a party owes recompute its balance from the
//! stored documents before committing. The party row is locked first, so
//! concurrent writers on one party are serialized.

use billfold_shared::types::{InvoiceId, NoteId, PartyId, PurchaseOrderId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use super::balance::{check_credit_limit, recompute_balance};
use super::types::{
    Invoice, NewInvoice, NewNote, NewParty, NewPurchaseOrder, NewSupplierInvoice, Note,
    NoteStatus, Party, PartyBalance, PartyKind, PartyStatement, PartyUpdate, PaymentStatus,
    PurchaseOrder, PurchaseOrderStatus,
};
use super::validation::{
    validate_document, validate_document_number, validate_new_party, validate_party_update,
};
use crate::error::LedgerError;
use crate::numbering::{DocumentKind, Numbering};
use crate::store::{LedgerStore, StoreError, StoreSession, finish};

/// Client and supplier operations.
#[derive(Debug, Clone)]
pub struct PartyService<S> {
    pub(super) store: S,
    pub(super) numbering: Numbering,
}

impl<S: LedgerStore> PartyService<S> {
    /// Creates a service over `store` numbering documents with `numbering`.
    #[must_use]
    pub const fn new(store: S, numbering: Numbering) -> Self {
        Self { store, numbering }
    }

    /// Creates a client.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank name or document number or a negative
    ///   credit limit
    /// - `AlreadyExists` if another client has the same document number
    pub async fn create_client(&self, owner: UserId, input: NewParty) -> Result<Party, LedgerError> {
        self.create_party(owner, PartyKind::Client, input).await
    }

    /// Creates a supplier. The tax id must be a CUIT (`NN-NNNNNNNN-N`).
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_client`], plus `Validation` for a malformed CUIT.
    pub async fn create_supplier(
        &self,
        owner: UserId,
        input: NewParty,
    ) -> Result<Party, LedgerError> {
        self.create_party(owner, PartyKind::Supplier, input).await
    }

    #[instrument(skip(self, input), fields(owner = %owner, kind = %kind))]
    async fn create_party(
        &self,
        owner: UserId,
        kind: PartyKind,
        input: NewParty,
    ) -> Result<Party, LedgerError> {
        validate_new_party(kind, &input)?;

        let party = Party {
            id: PartyId::new(),
            owner,
            kind,
            business_name: input.business_name.trim().to_string(),
            fantasy_name: input.fantasy_name,
            tax_id: input.tax_id.trim().to_string(),
            credit_limit: input.credit_limit,
            balance: PartyBalance::default(),
            is_active: true,
            created_at: Utc::now(),
        };

        let mut session = self.store.begin().await?;
        let result = session
            .insert_party(&party)
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => LedgerError::AlreadyExists(format!(
                    "{kind} with tax id {}",
                    party.tax_id
                )),
                other => other.into(),
            });
        finish(session, result).await?;

        info!(party_id = %party.id, "Party created");
        Ok(party)
    }

    /// Returns a party with all of its documents.
    ///
    /// # Errors
    ///
    /// Returns `PartyNotFound` if the party does not exist or belongs to
    /// another user.
    pub async fn party(&self, owner: UserId, party_id: PartyId) -> Result<PartyStatement, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let party = require_party(&mut session, owner, party_id).await?;
            Ok::<_, LedgerError>(PartyStatement {
                invoices: session.invoices(party.id).await?,
                notes: session.notes(party.id).await?,
                quotes: session.quotes(party.id).await?,
                payments: session.payments(party.id).await?,
                purchase_orders: session.purchase_orders(party.id).await?,
                party,
            })
        }
        .await;
        finish(session, result).await
    }

    /// Soft-deletes a party. Its documents are kept.
    #[instrument(skip(self), fields(owner = %owner, party_id = %party_id))]
    pub async fn deactivate(&self, owner: UserId, party_id: PartyId) -> Result<Party, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let party = require_party(&mut session, owner, party_id).await?;
            session.set_party_active(party.id, false).await?;
            Ok::<_, LedgerError>(Party {
                is_active: false,
                ..party
            })
        }
        .await;
        let party = finish(session, result).await?;

        info!("Party deactivated");
        Ok(party)
    }

    /// Lists the user's parties of `kind` by business name, inactive ones
    /// included.
    pub async fn parties(&self, owner: UserId, kind: PartyKind) -> Result<Vec<Party>, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = session.parties(owner, kind).await.map_err(LedgerError::from);
        finish(session, result).await
    }

    /// Changes a party's names or credit limit.
    ///
    /// The tax id and kind never change. Lowering the credit limit below the
    /// current balance is allowed; it only blocks new invoices.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank name or a negative credit limit
    /// - `PartyNotFound` if the party does not exist
    #[instrument(skip(self, update), fields(owner = %owner, party_id = %party_id))]
    pub async fn update_party(
        &self,
        owner: UserId,
        party_id: PartyId,
        update: PartyUpdate,
    ) -> Result<Party, LedgerError> {
        validate_party_update(&update)?;

        let mut session = self.store.begin().await?;
        let result = async {
            let mut party = require_party(&mut session, owner, party_id).await?;
            if let Some(name) = update.business_name {
                party.business_name = name.trim().to_string();
            }
            if update.fantasy_name.is_some() {
                party.fantasy_name = update.fantasy_name;
            }
            if let Some(limit) = update.credit_limit {
                party.credit_limit = limit;
            }
            session.update_party_details(&party).await?;
            Ok::<_, LedgerError>(party)
        }
        .await;
        let party = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Party update rejected"))?;

        info!("Party updated");
        Ok(party)
    }

    /// Issues an invoice to a client.
    ///
    /// The number comes from the client's invoice sequence.
    ///
    /// # Errors
    ///
    /// - `Validation` for missing lines or a non-positive total
    /// - `PartyNotFound` if the client does not exist
    /// - `CreditLimitExceeded` if the total would push the balance past the
    ///   credit limit; nothing is persisted
    #[instrument(skip(self, input), fields(owner = %owner, client_id = %client_id, total = %input.total))]
    pub async fn create_invoice(
        &self,
        owner: UserId,
        client_id: PartyId,
        input: NewInvoice,
    ) -> Result<Invoice, LedgerError> {
        validate_document(&input.items, input.total)?;

        let mut session = self.store.begin().await?;
        let result = async {
            let party =
                require_party_of_kind(&mut session, owner, client_id, PartyKind::Client).await?;
            check_credit_limit(&party, input.total)?;
            let number = self
                .numbering
                .next_number(&mut session, party.id, DocumentKind::Invoice)
                .await?;
            let now = Utc::now();
            let invoice = insert_invoice(&mut session, &party, number, input, owner, now).await?;
            recompute_in(&mut session, &party, now).await?;
            Ok::<_, LedgerError>(invoice)
        }
        .await;
        let invoice = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Invoice rejected"))?;

        info!(invoice_id = %invoice.id, invoice_number = %invoice.invoice_number, "Invoice created");
        Ok(invoice)
    }

    /// Records an invoice received from a supplier under its own number.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank number, missing lines or a non-positive total
    /// - `PartyNotFound` if the supplier does not exist
    /// - `AlreadyExists` if the supplier already has an invoice with that number
    /// - `CreditLimitExceeded` as for [`Self::create_invoice`]
    #[instrument(skip(self, input), fields(owner = %owner, supplier_id = %supplier_id))]
    pub async fn register_supplier_invoice(
        &self,
        owner: UserId,
        supplier_id: PartyId,
        input: NewSupplierInvoice,
    ) -> Result<Invoice, LedgerError> {
        validate_document_number("invoice number", &input.invoice_number)?;
        validate_document(&input.invoice.items, input.invoice.total)?;

        let mut session = self.store.begin().await?;
        let result = async {
            let party =
                require_party_of_kind(&mut session, owner, supplier_id, PartyKind::Supplier)
                    .await?;
            check_credit_limit(&party, input.invoice.total)?;
            let now = Utc::now();
            let number = input.invoice_number.trim().to_string();
            let invoice =
                insert_invoice(&mut session, &party, number, input.invoice, owner, now).await?;
            recompute_in(&mut session, &party, now).await?;
            Ok::<_, LedgerError>(invoice)
        }
        .await;
        let invoice = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Supplier invoice rejected"))?;

        info!(invoice_id = %invoice.id, "Supplier invoice registered");
        Ok(invoice)
    }

    /// Issues a pending credit or debit note against one of the party's
    /// invoices. The note does not affect the balance until applied.
    ///
    /// # Errors
    ///
    /// - `Validation` for missing lines or a non-positive total
    /// - `PartyNotFound` if the party does not exist
    /// - `InvoiceNotFound` if the related invoice is not one of the party's
    #[instrument(skip(self, input), fields(owner = %owner, party_id = %party_id))]
    pub async fn create_note(
        &self,
        owner: UserId,
        party_id: PartyId,
        input: NewNote,
    ) -> Result<Note, LedgerError> {
        validate_document(&input.items, input.total)?;

        let mut session = self.store.begin().await?;
        let result = async {
            let party = require_party(&mut session, owner, party_id).await?;
            let invoices = session.invoices(party.id).await?;
            if !invoices.iter().any(|i| i.id == input.related_invoice) {
                return Err(LedgerError::InvoiceNotFound(input.related_invoice));
            }
            let note_number = self
                .numbering
                .next_number(&mut session, party.id, DocumentKind::Note)
                .await?;
            let now = Utc::now();
            let note = Note {
                id: NoteId::new(),
                party_id: party.id,
                note_number,
                note_type: input.note_type,
                related_invoice: input.related_invoice,
                date: input.date,
                reason: input.reason,
                items: input.items,
                total: input.total,
                status: NoteStatus::Pending,
                created_by: owner,
                created_at: now,
            };
            session.insert_note(&note).await?;
            recompute_in(&mut session, &party, now).await?;
            Ok::<_, LedgerError>(note)
        }
        .await;
        let note = finish(session, result).await?;

        info!(note_id = %note.id, note_number = %note.note_number, "Note created");
        Ok(note)
    }

    /// Applies a pending note so it counts in the party balance.
    ///
    /// # Errors
    ///
    /// `NoteNotFound` if the note is not the party's, `Validation` if it is
    /// not pending.
    pub async fn apply_note(
        &self,
        owner: UserId,
        party_id: PartyId,
        note_id: NoteId,
    ) -> Result<Note, LedgerError> {
        self.transition_note(owner, party_id, note_id, NoteStatus::Applied)
            .await
    }

    /// Voids a pending note.
    ///
    /// # Errors
    ///
    /// Same as [`Self::apply_note`].
    pub async fn void_note(
        &self,
        owner: UserId,
        party_id: PartyId,
        note_id: NoteId,
    ) -> Result<Note, LedgerError> {
        self.transition_note(owner, party_id, note_id, NoteStatus::Voided)
            .await
    }

    #[instrument(skip(self), fields(owner = %owner, party_id = %party_id, note_id = %note_id))]
    async fn transition_note(
        &self,
        owner: UserId,
        party_id: PartyId,
        note_id: NoteId,
        to: NoteStatus,
    ) -> Result<Note, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let party = require_party(&mut session, owner, party_id).await?;
            let current = session
                .notes(party.id)
                .await?
                .into_iter()
                .find(|n| n.id == note_id)
                .ok_or(LedgerError::NoteNotFound(note_id))?;
            let note = session
                .transition_note(note_id, NoteStatus::Pending, to)
                .await?
                .ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "note {} is {}, only pending notes can become {}",
                        current.note_number,
                        current.status.as_str(),
                        to.as_str()
                    ))
                })?;
            recompute_in(&mut session, &party, Utc::now()).await?;
            Ok::<_, LedgerError>(note)
        }
        .await;
        let note = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Note transition rejected"))?;

        info!(status = note.status.as_str(), "Note updated");
        Ok(note)
    }

    /// Records a purchase order for a supplier.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank number, missing lines or a non-positive total
    /// - `PartyNotFound` if the supplier does not exist
    /// - `AlreadyExists` if the supplier already has an order with that number
    #[instrument(skip(self, input), fields(owner = %owner, supplier_id = %supplier_id))]
    pub async fn add_purchase_order(
        &self,
        owner: UserId,
        supplier_id: PartyId,
        input: NewPurchaseOrder,
    ) -> Result<PurchaseOrder, LedgerError> {
        validate_document_number("order number", &input.order_number)?;
        validate_document(&input.items, input.total)?;

        let mut session = self.store.begin().await?;
        let result = async {
            let party =
                require_party_of_kind(&mut session, owner, supplier_id, PartyKind::Supplier)
                    .await?;
            let order = PurchaseOrder {
                id: PurchaseOrderId::new(),
                party_id: party.id,
                order_number: input.order_number.trim().to_string(),
                date: input.date,
                expected_delivery_date: input.expected_delivery_date,
                items: input.items,
                total: input.total,
                status: PurchaseOrderStatus::Pending,
                created_by: owner,
                created_at: Utc::now(),
            };
            session
                .insert_purchase_order(&order)
                .await
                .map_err(|err| already_exists(err, "purchase order", &order.order_number))?;
            Ok::<_, LedgerError>(order)
        }
        .await;
        let order = finish(session, result).await?;

        info!(order_id = %order.id, "Purchase order added");
        Ok(order)
    }

    /// Recomputes and stores a party balance from its documents.
    #[instrument(skip(self), fields(owner = %owner, party_id = %party_id))]
    pub async fn recompute_balance(
        &self,
        owner: UserId,
        party_id: PartyId,
    ) -> Result<Party, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let party = require_party(&mut session, owner, party_id).await?;
            recompute_in(&mut session, &party, Utc::now()).await
        }
        .await;
        let party = finish(session, result).await?;

        info!(balance = %party.balance.current, "Balance recomputed");
        Ok(party)
    }
}

/// Reads and locks a party owned by `owner`.
pub(crate) async fn require_party<T: StoreSession>(
    session: &mut T,
    owner: UserId,
    party_id: PartyId,
) -> Result<Party, LedgerError> {
    session
        .lock_party(owner, party_id)
        .await?
        .ok_or(LedgerError::PartyNotFound(party_id))
}

/// Like [`require_party`], treating a party of another kind as missing.
pub(crate) async fn require_party_of_kind<T: StoreSession>(
    session: &mut T,
    owner: UserId,
    party_id: PartyId,
    kind: PartyKind,
) -> Result<Party, LedgerError> {
    let party = require_party(session, owner, party_id).await?;
    if party.kind != kind {
        return Err(LedgerError::PartyNotFound(party_id));
    }
    Ok(party)
}

/// Writes the balance derived from the party's stored documents.
pub(crate) async fn recompute_in<T: StoreSession>(
    session: &mut T,
    party: &Party,
    now: DateTime<Utc>,
) -> Result<Party, LedgerError> {
    let invoices = session.invoices(party.id).await?;
    let notes = session.notes(party.id).await?;
    let current = recompute_balance(&invoices, &notes)?;
    session.set_party_balance(party.id, current, now).await?;
    Ok(Party {
        balance: PartyBalance {
            current,
            last_update: Some(now),
        },
        ..party.clone()
    })
}

/// Inserts a pending invoice for a locked party.
pub(super) async fn insert_invoice<T: StoreSession>(
    session: &mut T,
    party: &Party,
    invoice_number: String,
    input: NewInvoice,
    created_by: UserId,
    now: DateTime<Utc>,
) -> Result<Invoice, LedgerError> {
    let invoice = Invoice {
        id: InvoiceId::new(),
        party_id: party.id,
        invoice_number,
        invoice_type: input.invoice_type,
        date: input.date,
        due_date: input.due_date,
        items: input.items,
        total: input.total,
        amount_paid: Decimal::ZERO,
        payment_status: PaymentStatus::Pending,
        observation: input.observation,
        created_by,
        created_at: now,
    };
    session
        .insert_invoice(&invoice)
        .await
        .map_err(|err| already_exists(err, "invoice", &invoice.invoice_number))?;
    Ok(invoice)
}

fn already_exists(err: StoreError, what: &str, number: &str) -> LedgerError {
    match err {
        StoreError::UniqueViolation(_) => {
            LedgerError::AlreadyExists(format!("{what} number {number}"))
        }
        other => other.into(),
    }
}
