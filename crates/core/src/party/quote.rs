//! Quotes and their conversion into invoices.
//!
//! Lifecycle: `Pending -> Approved | Rejected`, then `Approved -> Invoiced`.
//! Conversion creates the invoice, stamps the quote and recomputes the client
//! balance in one session.

use billfold_shared::types::{InvoiceId, PartyId, QuoteId, UserId};
use chrono::Utc;
use tracing::{info, instrument, warn};

use super::balance::check_credit_limit;
use super::service::{PartyService, insert_invoice, recompute_in, require_party_of_kind};
use super::types::{ConvertQuote, Invoice, NewInvoice, NewQuote, PartyKind, Quote, QuoteStatus};
use super::validation::validate_document;
use crate::error::LedgerError;
use crate::numbering::DocumentKind;
use crate::store::{LedgerStore, StoreSession, finish};

/// An invoice created from a quote, with the quote as stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// The new invoice.
    pub invoice: Invoice,
    /// The quote, now `Invoiced` and linked to the invoice.
    pub quote: Quote,
}

impl<S: LedgerStore> PartyService<S> {
    /// Offers a quote to a client.
    ///
    /// # Errors
    ///
    /// - `Validation` for missing lines, a non-positive total or an expiry
    ///   before the issue date
    /// - `PartyNotFound` if the client does not exist
    #[instrument(skip(self, input), fields(owner = %owner, client_id = %client_id))]
    pub async fn create_quote(
        &self,
        owner: UserId,
        client_id: PartyId,
        input: NewQuote,
    ) -> Result<Quote, LedgerError> {
        validate_document(&input.items, input.total)?;
        if input.valid_until < input.date {
            return Err(LedgerError::Validation(
                "quote expiry precedes its date".to_string(),
            ));
        }

        let mut session = self.store.begin().await?;
        let result = async {
            let party =
                require_party_of_kind(&mut session, owner, client_id, PartyKind::Client).await?;
            let quote_number = self
                .numbering
                .next_number(&mut session, party.id, DocumentKind::Quote)
                .await?;
            let quote = Quote {
                id: QuoteId::new(),
                party_id: party.id,
                quote_number,
                date: input.date,
                valid_until: input.valid_until,
                items: input.items,
                total: input.total,
                status: QuoteStatus::Pending,
                invoice_id: None,
                observation: input.observation,
                created_by: owner,
                created_at: Utc::now(),
            };
            session.insert_quote(&quote).await?;
            Ok::<_, LedgerError>(quote)
        }
        .await;
        let quote = finish(session, result).await?;

        info!(quote_id = %quote.id, quote_number = %quote.quote_number, "Quote created");
        Ok(quote)
    }

    /// Marks a pending quote approved.
    ///
    /// # Errors
    ///
    /// `QuoteNotFound` if the quote is not the client's, `Validation` if it
    /// is not pending.
    pub async fn approve_quote(
        &self,
        owner: UserId,
        client_id: PartyId,
        quote_id: QuoteId,
    ) -> Result<Quote, LedgerError> {
        self.move_quote(owner, client_id, quote_id, QuoteStatus::Approved)
            .await
    }

    /// Marks a pending quote rejected.
    ///
    /// # Errors
    ///
    /// Same as [`Self::approve_quote`].
    pub async fn reject_quote(
        &self,
        owner: UserId,
        client_id: PartyId,
        quote_id: QuoteId,
    ) -> Result<Quote, LedgerError> {
        self.move_quote(owner, client_id, quote_id, QuoteStatus::Rejected)
            .await
    }

    #[instrument(skip(self), fields(owner = %owner, client_id = %client_id, quote_id = %quote_id))]
    async fn move_quote(
        &self,
        owner: UserId,
        client_id: PartyId,
        quote_id: QuoteId,
        to: QuoteStatus,
    ) -> Result<Quote, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let party =
                require_party_of_kind(&mut session, owner, client_id, PartyKind::Client).await?;
            let current = find_quote(&mut session, party.id, quote_id).await?;
            transition(&mut session, &current, to, None).await
        }
        .await;
        let quote = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Quote transition rejected"))?;

        info!(status = quote.status.as_str(), "Quote updated");
        Ok(quote)
    }

    /// Turns an approved quote into an invoice.
    ///
    /// The invoice copies the quote's lines and total and takes the next
    /// number of the client's invoice sequence.
    ///
    /// # Errors
    ///
    /// - `PartyNotFound` if the client does not exist
    /// - `QuoteNotFound` if the quote is not the client's
    /// - `Validation` if the quote is not approved
    /// - `CreditLimitExceeded` if the invoice no longer fits the credit limit
    #[instrument(skip(self, options), fields(owner = %owner, client_id = %client_id, quote_id = %quote_id))]
    pub async fn convert_quote(
        &self,
        owner: UserId,
        client_id: PartyId,
        quote_id: QuoteId,
        options: ConvertQuote,
    ) -> Result<Conversion, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let party =
                require_party_of_kind(&mut session, owner, client_id, PartyKind::Client).await?;
            let current = find_quote(&mut session, party.id, quote_id).await?;
            if current.status != QuoteStatus::Approved {
                return Err(LedgerError::Validation(format!(
                    "quote {} is {}, only approved quotes can be invoiced",
                    current.quote_number,
                    current.status.as_str()
                )));
            }
            check_credit_limit(&party, current.total)?;

            let now = Utc::now();
            let number = self
                .numbering
                .next_number(&mut session, party.id, DocumentKind::Invoice)
                .await?;
            let input = NewInvoice {
                invoice_type: options.invoice_type,
                date: now,
                due_date: None,
                items: current.items.clone(),
                total: current.total,
                observation: Some(format!("Created from quote {}", current.quote_number)),
            };
            let invoice = insert_invoice(&mut session, &party, number, input, owner, now).await?;
            let quote =
                transition(&mut session, &current, QuoteStatus::Invoiced, Some(invoice.id)).await?;
            recompute_in(&mut session, &party, now).await?;
            Ok::<_, LedgerError>(Conversion { invoice, quote })
        }
        .await;
        let conversion = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Quote conversion rejected"))?;

        info!(
            invoice_id = %conversion.invoice.id,
            invoice_number = %conversion.invoice.invoice_number,
            "Quote converted"
        );
        Ok(conversion)
    }
}

async fn find_quote<T: StoreSession>(
    session: &mut T,
    party_id: PartyId,
    quote_id: QuoteId,
) -> Result<Quote, LedgerError> {
    session
        .quotes(party_id)
        .await?
        .into_iter()
        .find(|q| q.id == quote_id)
        .ok_or(LedgerError::QuoteNotFound(quote_id))
}

async fn transition<T: StoreSession>(
    session: &mut T,
    current: &Quote,
    to: QuoteStatus,
    invoice_id: Option<InvoiceId>,
) -> Result<Quote, LedgerError> {
    if !current.status.can_transition_to(to) {
        return Err(LedgerError::Validation(format!(
            "quote {} cannot move from {} to {}",
            current.quote_number,
            current.status.as_str(),
            to.as_str()
        )));
    }
    session
        .transition_quote(current.id, current.status, to, invoice_id)
        .await?
        .ok_or_else(|| {
            LedgerError::Validation(format!(
                "quote {} changed concurrently",
                current.quote_number
            ))
        })
}
