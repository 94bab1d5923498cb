//! Payment reconciliation.
//!
//! A payment touches up to four things in one session: the allocated
//! invoices, the party balance, one cash or bank account and the payment
//! log. The plan is validated before anything is written; any later failure
//! rolls every change back.

use billfold_shared::types::{PartyId, PaymentId, UserId};
use chrono::Utc;
use tracing::{info, instrument, warn};

use super::plan::{PaymentPlan, plan_payment};
use super::types::{NewPayment, Payment, PaymentReceipt};
use crate::account::service::post;
use crate::account::{
    Account, AccountKind, Category, PostTransactionInput, RelatedDocument, TransactionType,
};
use crate::error::LedgerError;
use crate::numbering::{DocumentKind, Numbering};
use crate::party::service::require_party_of_kind;
use crate::party::{Party, PartyBalance, PartyKind};
use crate::store::{LedgerStore, StoreSession, finish};

/// Records client and supplier payments.
#[derive(Debug, Clone)]
pub struct PaymentReconciler<S> {
    store: S,
    numbering: Numbering,
}

impl<S: LedgerStore> PaymentReconciler<S> {
    /// Creates a reconciler over `store`.
    #[must_use]
    pub const fn new(store: S, numbering: Numbering) -> Self {
        Self { store, numbering }
    }

    /// Records a payment received from a client.
    ///
    /// The money goes into the cash account for cash payments and into the
    /// bank account for transfers, checks and cards.
    ///
    /// # Errors
    ///
    /// - `PartyNotFound` if the client does not exist
    /// - the planning errors of [`plan_payment`]
    /// - `AccountNotConfigured` if the method's account does not exist
    pub async fn create_client_payment(
        &self,
        owner: UserId,
        client_id: PartyId,
        input: NewPayment,
    ) -> Result<PaymentReceipt, LedgerError> {
        self.create_payment(owner, client_id, PartyKind::Client, input)
            .await
    }

    /// Records a payment made to a supplier.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_client_payment`], plus `InsufficientFunds` if the
    /// paying account cannot cover the amount.
    pub async fn create_supplier_payment(
        &self,
        owner: UserId,
        supplier_id: PartyId,
        input: NewPayment,
    ) -> Result<PaymentReceipt, LedgerError> {
        self.create_payment(owner, supplier_id, PartyKind::Supplier, input)
            .await
    }

    #[instrument(
        skip(self, input),
        fields(owner = %owner, party_id = %party_id, kind = %kind, amount = %input.amount, method = input.payment_method.as_str())
    )]
    async fn create_payment(
        &self,
        owner: UserId,
        party_id: PartyId,
        kind: PartyKind,
        input: NewPayment,
    ) -> Result<PaymentReceipt, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let party = require_party_of_kind(&mut session, owner, party_id, kind).await?;
            let invoices = session.invoices(party.id).await?;
            let plan = plan_payment(&input, &invoices)?;

            let account = match input.payment_method.account_kind() {
                Some(account_kind) => Some(
                    session
                        .lock_account(owner, account_kind)
                        .await?
                        .ok_or(LedgerError::AccountNotConfigured(account_kind))?,
                ),
                None => None,
            };

            let document_kind = match kind {
                PartyKind::Client => DocumentKind::ClientPayment,
                PartyKind::Supplier => DocumentKind::SupplierPayment,
            };
            let payment_number = self
                .numbering
                .next_number(&mut session, party.id, document_kind)
                .await?;

            apply_in(&mut session, owner, party, account, plan, payment_number, input).await
        }
        .await;
        let receipt = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Payment rejected"))?;

        info!(
            payment_id = %receipt.payment.id,
            payment_number = %receipt.payment.payment_number,
            balance = %receipt.party.balance.current,
            "Payment recorded"
        );
        Ok(receipt)
    }
}

async fn apply_in<T: StoreSession>(
    session: &mut T,
    owner: UserId,
    party: Party,
    account: Option<Account>,
    plan: PaymentPlan,
    payment_number: String,
    input: NewPayment,
) -> Result<PaymentReceipt, LedgerError> {
    let now = Utc::now();

    let mut invoices = Vec::with_capacity(plan.allocations.len());
    for allocation in &plan.allocations {
        let invoice = session
            .apply_invoice_payment(allocation.invoice_id, allocation.amount)
            .await?
            .ok_or(LedgerError::InvoiceAlreadyPaid(allocation.invoice_id))?;
        invoices.push(invoice);
    }

    let current = session
        .adjust_party_balance(party.id, -plan.amount, now)
        .await?;

    let posting = match account {
        Some(account) => {
            let entry = ledger_entry(&party, &account, &plan, &payment_number, &input);
            Some(post(session, &account, entry, input.date, now).await?)
        }
        None => None,
    };

    let payment = Payment {
        id: PaymentId::new(),
        party_id: party.id,
        payment_number,
        date: input.date,
        payment_method: input.payment_method,
        amount: plan.amount,
        allocations: input.allocations,
        reference: input.reference,
        observation: input.observation,
        transaction_id: posting.as_ref().map(|p| p.transaction.id),
        created_by: owner,
        created_at: now,
    };
    session.insert_payment(&payment).await?;

    Ok(PaymentReceipt {
        payment,
        party: Party {
            balance: PartyBalance {
                current,
                last_update: Some(now),
            },
            ..party
        },
        invoices,
        posting,
    })
}

fn ledger_entry(
    party: &Party,
    account: &Account,
    plan: &PaymentPlan,
    payment_number: &str,
    input: &NewPayment,
) -> PostTransactionInput {
    let (transaction_type, category, description) = match party.kind {
        PartyKind::Client => (
            TransactionType::Income,
            match account.kind {
                AccountKind::Cash => Category::Sale,
                AccountKind::Bank => Category::CustomerCollection,
            },
            format!("Payment {payment_number} received from {}", party.business_name),
        ),
        PartyKind::Supplier => (
            TransactionType::Expense,
            Category::SupplierPayment,
            format!("Payment {payment_number} to {}", party.business_name),
        ),
    };

    PostTransactionInput {
        transaction_type,
        amount: plan.amount,
        description,
        category,
        related_document: plan.primary_invoice().map(RelatedDocument::invoice),
        reference: Some(
            input
                .reference
                .clone()
                .unwrap_or_else(|| payment_number.to_string()),
        ),
    }
}
