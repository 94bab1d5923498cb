//! Payment domain types.

use billfold_shared::types::{InvoiceId, PartyId, PaymentId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{AccountKind, Posting};
use crate::party::{Invoice, Party};

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash.
    Cash,
    /// Bank transfer.
    Transfer,
    /// Check.
    Check,
    /// Card.
    Card,
    /// Anything else; no account is touched.
    Other,
}

impl PaymentMethod {
    /// Account that receives or pays out the money, if any.
    #[must_use]
    pub const fn account_kind(&self) -> Option<AccountKind> {
        match self {
            Self::Cash => Some(AccountKind::Cash),
            Self::Transfer | Self::Check | Self::Card => Some(AccountKind::Bank),
            Self::Other => None,
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Transfer => "TRANSFER",
            Self::Check => "CHECK",
            Self::Card => "CARD",
            Self::Other => "OTHER",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(Self::Cash),
            "TRANSFER" => Some(Self::Transfer),
            "CHECK" => Some(Self::Check),
            "CARD" => Some(Self::Card),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Portion of a payment applied to one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    /// Target invoice.
    pub invoice_id: InvoiceId,
    /// Amount applied.
    pub amount: Decimal,
}

/// A recorded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment id.
    pub id: PaymentId,
    /// Paying (client) or paid (supplier) party.
    pub party_id: PartyId,
    /// Human-readable number.
    pub payment_number: String,
    /// Payment date.
    pub date: DateTime<Utc>,
    /// Method.
    pub payment_method: PaymentMethod,
    /// Total, equal to the sum of allocations.
    pub amount: Decimal,
    /// Per-invoice allocations.
    pub allocations: Vec<PaymentAllocation>,
    /// External reference (bank transaction, check number, ...).
    pub reference: Option<String>,
    /// Free text.
    pub observation: Option<String>,
    /// Ledger posting produced by the payment.
    pub transaction_id: Option<TransactionId>,
    /// Creating user.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Payment date.
    pub date: DateTime<Utc>,
    /// Method.
    pub payment_method: PaymentMethod,
    /// Total amount.
    pub amount: Decimal,
    /// Per-invoice allocations; must add up to `amount`.
    pub allocations: Vec<PaymentAllocation>,
    /// External reference.
    pub reference: Option<String>,
    /// Free text.
    pub observation: Option<String>,
}

/// Everything a committed payment changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    /// The stored payment.
    pub payment: Payment,
    /// Party after the balance update.
    pub party: Party,
    /// Allocated invoices after the status update.
    pub invoices: Vec<Invoice>,
    /// Ledger posting; `None` for [`PaymentMethod::Other`].
    pub posting: Option<Posting>,
}
