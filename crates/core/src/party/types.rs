//! Party and document domain types.
//!
//! Clients and suppliers share one [`Party`] shape distinguished by
//! [`PartyKind`]. Their documents (invoices, notes, quotes, purchase orders)
//! are stored in separate collections keyed by party id; the party itself
//! carries only the running balance.

use std::fmt;

use billfold_shared::types::{
    InvoiceId, NoteId, PartyId, PurchaseOrderId, QuoteId, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::payment::Payment;

/// Client or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyKind {
    /// Customer; its balance is what it owes us.
    Client,
    /// Supplier; its balance is what we owe it.
    Supplier,
}

impl PartyKind {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::Supplier => "SUPPLIER",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CLIENT" => Some(Self::Client),
            "SUPPLIER" => Some(Self::Supplier),
            _ => None,
        }
    }
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Supplier => write!(f, "supplier"),
        }
    }
}

/// Running balance of a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartyBalance {
    /// Amount owed (positive) or credit (negative).
    pub current: Decimal,
    /// Time of the last balance change.
    pub last_update: Option<DateTime<Utc>>,
}

/// A client or supplier owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Party id.
    pub id: PartyId,
    /// Owning user.
    pub owner: UserId,
    /// Client or supplier.
    pub kind: PartyKind,
    /// Legal name.
    pub business_name: String,
    /// Trade name.
    pub fantasy_name: Option<String>,
    /// Client document number or supplier CUIT, unique per kind.
    pub tax_id: String,
    /// Credit limit; zero means unlimited.
    pub credit_limit: Decimal,
    /// Running balance.
    pub balance: PartyBalance,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a party.
#[derive(Debug, Clone)]
pub struct NewParty {
    /// Legal name (required).
    pub business_name: String,
    /// Trade name.
    pub fantasy_name: Option<String>,
    /// Client document number or supplier CUIT.
    pub tax_id: String,
    /// Credit limit; zero means unlimited.
    pub credit_limit: Decimal,
}

/// Changes to a party's editable fields. `None` leaves a field unchanged.
///
/// The tax id and kind are fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct PartyUpdate {
    /// New legal name.
    pub business_name: Option<String>,
    /// New trade name.
    pub fantasy_name: Option<String>,
    /// New credit limit; zero means unlimited.
    pub credit_limit: Option<Decimal>,
}

// ========== Documents ==========

/// Fiscal invoice letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    /// Type A.
    A,
    /// Type B.
    B,
    /// Type C.
    C,
    /// Type M.
    M,
    /// Type E (export).
    E,
}

impl InvoiceType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::M => "M",
            Self::E => "E",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "M" => Some(Self::M),
            "E" => Some(Self::E),
            _ => None,
        }
    }
}

/// Invoice payment status. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Nothing paid yet.
    Pending,
    /// Partially paid.
    Partial,
    /// Fully paid.
    Paid,
}

impl PaymentStatus {
    /// Status of an invoice of `total` after `amount_paid` has been applied.
    #[must_use]
    pub fn after_payment(total: Decimal, amount_paid: Decimal) -> Self {
        if amount_paid >= total {
            Self::Paid
        } else if amount_paid > Decimal::ZERO {
            Self::Partial
        } else {
            Self::Pending
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Partial => "PARTIAL",
            Self::Paid => "PAID",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PARTIAL" => Some(Self::Partial),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Line of an invoice, quote, note or purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product or service description.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit price.
    pub unit_price: Decimal,
    /// Discount percentage.
    #[serde(default)]
    pub discount: Decimal,
    /// Line subtotal.
    pub subtotal: Decimal,
}

/// Invoice issued to a client or received from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice id.
    pub id: InvoiceId,
    /// Owning party.
    pub party_id: PartyId,
    /// Human-readable number.
    pub invoice_number: String,
    /// Fiscal letter.
    pub invoice_type: InvoiceType,
    /// Issue date.
    pub date: DateTime<Utc>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Lines.
    pub items: Vec<LineItem>,
    /// Total, fixed at creation.
    pub total: Decimal,
    /// Cumulative amount applied by payments.
    pub amount_paid: Decimal,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Free text.
    pub observation: Option<String>,
    /// Creating user.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Amount still to be paid.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        if self.payment_status == PaymentStatus::Paid {
            Decimal::ZERO
        } else {
            (self.total - self.amount_paid).max(Decimal::ZERO)
        }
    }

    /// What the invoice contributes to the party balance.
    ///
    /// Negative when the invoice was overpaid; the excess is credit.
    #[must_use]
    pub fn net_due(&self) -> Decimal {
        self.total - self.amount_paid
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Fiscal letter.
    pub invoice_type: InvoiceType,
    /// Issue date.
    pub date: DateTime<Utc>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Lines (at least one).
    pub items: Vec<LineItem>,
    /// Total (must be positive).
    pub total: Decimal,
    /// Free text.
    pub observation: Option<String>,
}

/// Input for registering an invoice received from a supplier.
#[derive(Debug, Clone)]
pub struct NewSupplierInvoice {
    /// The supplier's own invoice number, unique per supplier.
    pub invoice_number: String,
    /// Invoice content.
    pub invoice: NewInvoice,
}

/// Credit or debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteType {
    /// Reduces the party balance when applied.
    Credit,
    /// Increases the party balance when applied.
    Debit,
}

impl NoteType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREDIT" => Some(Self::Credit),
            "DEBIT" => Some(Self::Debit),
            _ => None,
        }
    }
}

/// Note lifecycle: `Pending -> Applied | Voided`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteStatus {
    /// Issued but not yet affecting the balance.
    Pending,
    /// Counted in the party balance.
    Applied,
    /// Cancelled.
    Voided,
}

impl NoteStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Applied => "APPLIED",
            Self::Voided => "VOIDED",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "APPLIED" => Some(Self::Applied),
            "VOIDED" => Some(Self::Voided),
            _ => None,
        }
    }
}

/// Credit or debit note against one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Note id.
    pub id: NoteId,
    /// Owning party.
    pub party_id: PartyId,
    /// Human-readable number.
    pub note_number: String,
    /// Credit or debit.
    pub note_type: NoteType,
    /// Invoice the note adjusts (weak reference).
    pub related_invoice: InvoiceId,
    /// Issue date.
    pub date: DateTime<Utc>,
    /// Reason for the adjustment.
    pub reason: Option<String>,
    /// Lines.
    pub items: Vec<LineItem>,
    /// Total.
    pub total: Decimal,
    /// Lifecycle status.
    pub status: NoteStatus,
    /// Creating user.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a note.
#[derive(Debug, Clone)]
pub struct NewNote {
    /// Credit or debit.
    pub note_type: NoteType,
    /// Invoice the note adjusts.
    pub related_invoice: InvoiceId,
    /// Issue date.
    pub date: DateTime<Utc>,
    /// Reason.
    pub reason: Option<String>,
    /// Lines.
    pub items: Vec<LineItem>,
    /// Total (must be positive).
    pub total: Decimal,
}

/// Quote lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    /// Awaiting the client's answer.
    Pending,
    /// Accepted; may be converted.
    Approved,
    /// Declined (terminal).
    Rejected,
    /// Converted into an invoice (terminal).
    Invoiced,
}

impl QuoteStatus {
    /// Returns true if the lifecycle allows moving to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected) | (Self::Approved, Self::Invoiced)
        )
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Invoiced => "INVOICED",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "INVOICED" => Some(Self::Invoiced),
            _ => None,
        }
    }
}

/// Quote offered to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Quote id.
    pub id: QuoteId,
    /// Owning client.
    pub party_id: PartyId,
    /// Human-readable number.
    pub quote_number: String,
    /// Issue date.
    pub date: DateTime<Utc>,
    /// Expiry date.
    pub valid_until: DateTime<Utc>,
    /// Lines, copied verbatim into the invoice on conversion.
    pub items: Vec<LineItem>,
    /// Total.
    pub total: Decimal,
    /// Lifecycle status.
    pub status: QuoteStatus,
    /// Invoice created from this quote.
    pub invoice_id: Option<InvoiceId>,
    /// Free text.
    pub observation: Option<String>,
    /// Creating user.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a quote.
#[derive(Debug, Clone)]
pub struct NewQuote {
    /// Issue date.
    pub date: DateTime<Utc>,
    /// Expiry date.
    pub valid_until: DateTime<Utc>,
    /// Lines (at least one).
    pub items: Vec<LineItem>,
    /// Total (must be positive).
    pub total: Decimal,
    /// Free text.
    pub observation: Option<String>,
}

/// Options for turning an approved quote into an invoice.
#[derive(Debug, Clone, Copy)]
pub struct ConvertQuote {
    /// Fiscal letter of the new invoice.
    pub invoice_type: InvoiceType,
}

/// Purchase order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    /// Nothing delivered.
    Pending,
    /// Partially delivered.
    Partial,
    /// Fully delivered.
    Completed,
    /// Cancelled.
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Partial => "PARTIAL",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PARTIAL" => Some(Self::Partial),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Purchase order sent to a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    /// Order id.
    pub id: PurchaseOrderId,
    /// Owning supplier.
    pub party_id: PartyId,
    /// Caller-supplied number, unique per supplier.
    pub order_number: String,
    /// Order date.
    pub date: DateTime<Utc>,
    /// Expected delivery.
    pub expected_delivery_date: Option<DateTime<Utc>>,
    /// Lines.
    pub items: Vec<LineItem>,
    /// Total.
    pub total: Decimal,
    /// Delivery status.
    pub status: PurchaseOrderStatus,
    /// Creating user.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a purchase order.
#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    /// Order number.
    pub order_number: String,
    /// Order date.
    pub date: DateTime<Utc>,
    /// Expected delivery.
    pub expected_delivery_date: Option<DateTime<Utc>>,
    /// Lines (at least one).
    pub items: Vec<LineItem>,
    /// Total (must be positive).
    pub total: Decimal,
}

/// A party with all of its documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyStatement {
    /// The party.
    pub party: Party,
    /// Invoices, oldest first.
    pub invoices: Vec<Invoice>,
    /// Credit and debit notes.
    pub notes: Vec<Note>,
    /// Quotes (clients only).
    pub quotes: Vec<Quote>,
    /// Payments.
    pub payments: Vec<Payment>,
    /// Purchase orders (suppliers only).
    pub purchase_orders: Vec<PurchaseOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(500), dec!(0), PaymentStatus::Pending)]
    #[case(dec!(500), dec!(200), PaymentStatus::Partial)]
    #[case(dec!(500), dec!(500), PaymentStatus::Paid)]
    #[case(dec!(500), dec!(600), PaymentStatus::Paid)]
    fn test_status_after_payment(
        #[case] total: Decimal,
        #[case] paid: Decimal,
        #[case] expected: PaymentStatus,
    ) {
        assert_eq!(PaymentStatus::after_payment(total, paid), expected);
    }

    #[rstest]
    #[case(QuoteStatus::Pending, QuoteStatus::Approved, true)]
    #[case(QuoteStatus::Pending, QuoteStatus::Rejected, true)]
    #[case(QuoteStatus::Approved, QuoteStatus::Invoiced, true)]
    #[case(QuoteStatus::Pending, QuoteStatus::Invoiced, false)]
    #[case(QuoteStatus::Rejected, QuoteStatus::Approved, false)]
    #[case(QuoteStatus::Invoiced, QuoteStatus::Pending, false)]
    #[case(QuoteStatus::Approved, QuoteStatus::Rejected, false)]
    fn test_quote_transitions(
        #[case] from: QuoteStatus,
        #[case] to: QuoteStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_storage_strings_parse_back() {
        for status in [PaymentStatus::Pending, PaymentStatus::Partial, PaymentStatus::Paid] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        for status in [NoteStatus::Pending, NoteStatus::Applied, NoteStatus::Voided] {
            assert_eq!(NoteStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvoiceType::parse("E"), Some(InvoiceType::E));
        assert_eq!(PartyKind::parse("SUPPLIER"), Some(PartyKind::Supplier));
        assert_eq!(NoteType::parse("DEBIT"), Some(NoteType::Debit));
        assert_eq!(
            PurchaseOrderStatus::parse("CANCELLED"),
            Some(PurchaseOrderStatus::Cancelled)
        );
        assert_eq!(QuoteStatus::parse("FACTURADO"), None);
    }
}
