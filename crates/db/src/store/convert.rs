//! Conversions between entity models and core domain types.

use billfold_core::account::{
    Account, AccountKind, BankAccountType, BankDetails, Category, DocumentType, RelatedDocument,
    Transaction, TransactionType,
};
use billfold_core::party::{
    Invoice, InvoiceType, LineItem, Note, NoteStatus, NoteType, Party, PartyBalance, PartyKind,
    PaymentStatus, PurchaseOrder, PurchaseOrderStatus, Quote, QuoteStatus,
};
use billfold_core::payment::{Payment, PaymentAllocation, PaymentMethod};
use billfold_core::store::{StoreError, StoreResult};
use billfold_shared::types::{
    AccountId, InvoiceId, NoteId, PartyId, PaymentId, PurchaseOrderId, QuoteId, TransactionId,
    UserId,
};
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::prelude::{DateTimeWithTimeZone, Json};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::entities::{
    account_transactions, accounts, invoices, notes, parties, payments, purchase_orders, quotes,
};

fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn stored(value: DateTime<Utc>) -> DateTimeWithTimeZone {
    value.into()
}

fn parse<T>(value: &str, parser: fn(&str) -> Option<T>, what: &str) -> StoreResult<T> {
    parser(value).ok_or_else(|| StoreError::Backend(format!("invalid stored {what}: {value}")))
}

fn to_json<T: Serialize>(value: &T) -> StoreResult<Json> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn from_json<T: DeserializeOwned>(value: Json) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

// ========== Accounts ==========

pub(super) fn account(model: accounts::Model) -> StoreResult<Account> {
    let bank = match (model.bank_name, model.account_number) {
        (Some(bank_name), Some(account_number)) => Some(BankDetails {
            account_number,
            bank_name,
            account_type: model
                .bank_account_type
                .as_deref()
                .and_then(BankAccountType::parse)
                .unwrap_or_default(),
        }),
        _ => None,
    };

    Ok(Account {
        id: AccountId::from_uuid(model.id),
        owner: UserId::from_uuid(model.owner_id),
        kind: parse(&model.kind, AccountKind::parse, "account kind")?,
        balance: model.balance,
        bank,
        last_updated: utc(model.last_updated),
        created_at: utc(model.created_at),
    })
}

pub(super) fn account_model(account: &Account) -> accounts::ActiveModel {
    let bank = account.bank.as_ref();
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        owner_id: Set(account.owner.into_inner()),
        kind: Set(account.kind.as_str().to_string()),
        balance: Set(account.balance),
        bank_name: Set(bank.map(|b| b.bank_name.clone())),
        bank_account_type: Set(bank.map(|b| b.account_type.as_str().to_string())),
        account_number: Set(bank.map(|b| b.account_number.clone())),
        last_updated: Set(stored(account.last_updated)),
        created_at: Set(stored(account.created_at)),
    }
}

pub(super) fn transaction(model: account_transactions::Model) -> StoreResult<Transaction> {
    let related_document = match (model.related_document_type, model.related_document_id) {
        (Some(kind), Some(document_id)) => Some(RelatedDocument {
            document_type: parse(&kind, DocumentType::parse, "document type")?,
            document_id,
        }),
        _ => None,
    };

    Ok(Transaction {
        id: TransactionId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        transaction_type: parse(
            &model.transaction_type,
            TransactionType::parse,
            "transaction type",
        )?,
        amount: model.amount,
        description: model.description,
        category: parse(&model.category, Category::parse, "category")?,
        related_document,
        reference: model.reference,
        date: utc(model.date),
    })
}

pub(super) fn transaction_model(transaction: &Transaction) -> account_transactions::ActiveModel {
    let related = transaction.related_document.as_ref();
    account_transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        seq: NotSet,
        account_id: Set(transaction.account_id.into_inner()),
        transaction_type: Set(transaction.transaction_type.as_str().to_string()),
        amount: Set(transaction.amount),
        description: Set(transaction.description.clone()),
        category: Set(transaction.category.as_str().to_string()),
        related_document_type: Set(related.map(|r| r.document_type.as_str().to_string())),
        related_document_id: Set(related.map(|r| r.document_id)),
        reference: Set(transaction.reference.clone()),
        date: Set(stored(transaction.date)),
    }
}

// ========== Parties ==========

pub(super) fn party(model: parties::Model) -> StoreResult<Party> {
    Ok(Party {
        id: PartyId::from_uuid(model.id),
        owner: UserId::from_uuid(model.owner_id),
        kind: parse(&model.kind, PartyKind::parse, "party kind")?,
        business_name: model.business_name,
        fantasy_name: model.fantasy_name,
        tax_id: model.tax_id,
        credit_limit: model.credit_limit,
        balance: PartyBalance {
            current: model.balance,
            last_update: model.balance_updated_at.map(utc),
        },
        is_active: model.is_active,
        created_at: utc(model.created_at),
    })
}

pub(super) fn party_model(party: &Party) -> parties::ActiveModel {
    parties::ActiveModel {
        id: Set(party.id.into_inner()),
        owner_id: Set(party.owner.into_inner()),
        kind: Set(party.kind.as_str().to_string()),
        business_name: Set(party.business_name.clone()),
        fantasy_name: Set(party.fantasy_name.clone()),
        tax_id: Set(party.tax_id.clone()),
        credit_limit: Set(party.credit_limit),
        balance: Set(party.balance.current),
        balance_updated_at: Set(party.balance.last_update.map(stored)),
        is_active: Set(party.is_active),
        created_at: Set(stored(party.created_at)),
    }
}

// ========== Documents ==========

pub(super) fn invoice(model: invoices::Model) -> StoreResult<Invoice> {
    Ok(Invoice {
        id: InvoiceId::from_uuid(model.id),
        party_id: PartyId::from_uuid(model.party_id),
        invoice_number: model.invoice_number,
        invoice_type: parse(&model.invoice_type, InvoiceType::parse, "invoice type")?,
        date: utc(model.date),
        due_date: model.due_date.map(utc),
        items: from_json::<Vec<LineItem>>(model.items)?,
        total: model.total,
        amount_paid: model.amount_paid,
        payment_status: parse(&model.payment_status, PaymentStatus::parse, "payment status")?,
        observation: model.observation,
        created_by: UserId::from_uuid(model.created_by),
        created_at: utc(model.created_at),
    })
}

pub(super) fn invoice_model(invoice: &Invoice) -> StoreResult<invoices::ActiveModel> {
    Ok(invoices::ActiveModel {
        id: Set(invoice.id.into_inner()),
        seq: NotSet,
        party_id: Set(invoice.party_id.into_inner()),
        invoice_number: Set(invoice.invoice_number.clone()),
        invoice_type: Set(invoice.invoice_type.as_str().to_string()),
        date: Set(stored(invoice.date)),
        due_date: Set(invoice.due_date.map(stored)),
        items: Set(to_json(&invoice.items)?),
        total: Set(invoice.total),
        amount_paid: Set(invoice.amount_paid),
        payment_status: Set(invoice.payment_status.as_str().to_string()),
        observation: Set(invoice.observation.clone()),
        created_by: Set(invoice.created_by.into_inner()),
        created_at: Set(stored(invoice.created_at)),
    })
}

pub(super) fn note(model: notes::Model) -> StoreResult<Note> {
    Ok(Note {
        id: NoteId::from_uuid(model.id),
        party_id: PartyId::from_uuid(model.party_id),
        note_number: model.note_number,
        note_type: parse(&model.note_type, NoteType::parse, "note type")?,
        related_invoice: InvoiceId::from_uuid(model.related_invoice),
        date: utc(model.date),
        reason: model.reason,
        items: from_json::<Vec<LineItem>>(model.items)?,
        total: model.total,
        status: parse(&model.status, NoteStatus::parse, "note status")?,
        created_by: UserId::from_uuid(model.created_by),
        created_at: utc(model.created_at),
    })
}

pub(super) fn note_model(note: &Note) -> StoreResult<notes::ActiveModel> {
    Ok(notes::ActiveModel {
        id: Set(note.id.into_inner()),
        seq: NotSet,
        party_id: Set(note.party_id.into_inner()),
        note_number: Set(note.note_number.clone()),
        note_type: Set(note.note_type.as_str().to_string()),
        related_invoice: Set(note.related_invoice.into_inner()),
        date: Set(stored(note.date)),
        reason: Set(note.reason.clone()),
        items: Set(to_json(&note.items)?),
        total: Set(note.total),
        status: Set(note.status.as_str().to_string()),
        created_by: Set(note.created_by.into_inner()),
        created_at: Set(stored(note.created_at)),
    })
}

pub(super) fn quote(model: quotes::Model) -> StoreResult<Quote> {
    Ok(Quote {
        id: QuoteId::from_uuid(model.id),
        party_id: PartyId::from_uuid(model.party_id),
        quote_number: model.quote_number,
        date: utc(model.date),
        valid_until: utc(model.valid_until),
        items: from_json::<Vec<LineItem>>(model.items)?,
        total: model.total,
        status: parse(&model.status, QuoteStatus::parse, "quote status")?,
        invoice_id: model.invoice_id.map(InvoiceId::from_uuid),
        observation: model.observation,
        created_by: UserId::from_uuid(model.created_by),
        created_at: utc(model.created_at),
    })
}

pub(super) fn quote_model(quote: &Quote) -> StoreResult<quotes::ActiveModel> {
    Ok(quotes::ActiveModel {
        id: Set(quote.id.into_inner()),
        seq: NotSet,
        party_id: Set(quote.party_id.into_inner()),
        quote_number: Set(quote.quote_number.clone()),
        date: Set(stored(quote.date)),
        valid_until: Set(stored(quote.valid_until)),
        items: Set(to_json(&quote.items)?),
        total: Set(quote.total),
        status: Set(quote.status.as_str().to_string()),
        invoice_id: Set(quote.invoice_id.map(InvoiceId::into_inner)),
        observation: Set(quote.observation.clone()),
        created_by: Set(quote.created_by.into_inner()),
        created_at: Set(stored(quote.created_at)),
    })
}

pub(super) fn payment(model: payments::Model) -> StoreResult<Payment> {
    Ok(Payment {
        id: PaymentId::from_uuid(model.id),
        party_id: PartyId::from_uuid(model.party_id),
        payment_number: model.payment_number,
        date: utc(model.date),
        payment_method: parse(&model.payment_method, PaymentMethod::parse, "payment method")?,
        amount: model.amount,
        allocations: from_json::<Vec<PaymentAllocation>>(model.allocations)?,
        reference: model.reference,
        observation: model.observation,
        transaction_id: model.transaction_id.map(TransactionId::from_uuid),
        created_by: UserId::from_uuid(model.created_by),
        created_at: utc(model.created_at),
    })
}

pub(super) fn payment_model(payment: &Payment) -> StoreResult<payments::ActiveModel> {
    Ok(payments::ActiveModel {
        id: Set(payment.id.into_inner()),
        seq: NotSet,
        party_id: Set(payment.party_id.into_inner()),
        payment_number: Set(payment.payment_number.clone()),
        date: Set(stored(payment.date)),
        payment_method: Set(payment.payment_method.as_str().to_string()),
        amount: Set(payment.amount),
        allocations: Set(to_json(&payment.allocations)?),
        reference: Set(payment.reference.clone()),
        observation: Set(payment.observation.clone()),
        transaction_id: Set(payment.transaction_id.map(TransactionId::into_inner)),
        created_by: Set(payment.created_by.into_inner()),
        created_at: Set(stored(payment.created_at)),
    })
}

pub(super) fn purchase_order(model: purchase_orders::Model) -> StoreResult<PurchaseOrder> {
    Ok(PurchaseOrder {
        id: PurchaseOrderId::from_uuid(model.id),
        party_id: PartyId::from_uuid(model.party_id),
        order_number: model.order_number,
        date: utc(model.date),
        expected_delivery_date: model.expected_delivery_date.map(utc),
        items: from_json::<Vec<LineItem>>(model.items)?,
        total: model.total,
        status: parse(&model.status, PurchaseOrderStatus::parse, "order status")?,
        created_by: UserId::from_uuid(model.created_by),
        created_at: utc(model.created_at),
    })
}

pub(super) fn purchase_order_model(
    order: &PurchaseOrder,
) -> StoreResult<purchase_orders::ActiveModel> {
    Ok(purchase_orders::ActiveModel {
        id: Set(order.id.into_inner()),
        seq: NotSet,
        party_id: Set(order.party_id.into_inner()),
        order_number: Set(order.order_number.clone()),
        date: Set(stored(order.date)),
        expected_delivery_date: Set(order.expected_delivery_date.map(stored)),
        items: Set(to_json(&order.items)?),
        total: Set(order.total),
        status: Set(order.status.as_str().to_string()),
        created_by: Set(order.created_by.into_inner()),
        created_at: Set(stored(order.created_at)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_round_trip_keeps_bank_details() {
        let now = Utc::now();
        let original = Account::open(
            UserId::new(),
            AccountKind::Bank,
            Some(BankDetails::default_at(now)),
            now,
        );

        let active = account_model(&original);
        let model = accounts::Model {
            id: active.id.unwrap(),
            owner_id: active.owner_id.unwrap(),
            kind: active.kind.unwrap(),
            balance: active.balance.unwrap(),
            bank_name: active.bank_name.unwrap(),
            bank_account_type: active.bank_account_type.unwrap(),
            account_number: active.account_number.unwrap(),
            last_updated: active.last_updated.unwrap(),
            created_at: active.created_at.unwrap(),
        };
        assert_eq!(account(model).unwrap(), original);
    }

    #[test]
    fn test_unknown_stored_value_is_backend_error() {
        let now = stored(Utc::now());
        let model = parties::Model {
            id: PartyId::new().into_inner(),
            owner_id: UserId::new().into_inner(),
            kind: "VENDOR".to_string(),
            business_name: "X".to_string(),
            fantasy_name: None,
            tax_id: "1".to_string(),
            credit_limit: dec!(0),
            balance: dec!(0),
            balance_updated_at: None,
            is_active: true,
            created_at: now,
        };
        assert!(matches!(party(model), Err(StoreError::Backend(_))));
    }
}
