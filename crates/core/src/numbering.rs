//! Sequential document numbers.
//!
//! Each `(party, document kind)` pair owns a dedicated counter in the store.
//! [`StoreSession::next_sequence`] increments it atomically inside the
//! caller's session, so two concurrent documents can never draw the same
//! number and a rolled-back document releases its number.

use billfold_shared::config::{NumberFormatConfig, NumberingConfig};
use billfold_shared::types::PartyId;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::store::StoreSession;

/// Kind of numbered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    /// Client invoice.
    Invoice,
    /// Payment received from a client.
    ClientPayment,
    /// Payment made to a supplier.
    SupplierPayment,
    /// Quote.
    Quote,
    /// Credit or debit note.
    Note,
}

impl DocumentKind {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "INVOICE",
            Self::ClientPayment => "CLIENT_PAYMENT",
            Self::SupplierPayment => "SUPPLIER_PAYMENT",
            Self::Quote => "QUOTE",
            Self::Note => "NOTE",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INVOICE" => Some(Self::Invoice),
            "CLIENT_PAYMENT" => Some(Self::ClientPayment),
            "SUPPLIER_PAYMENT" => Some(Self::SupplierPayment),
            "QUOTE" => Some(Self::Quote),
            "NOTE" => Some(Self::Note),
            _ => None,
        }
    }
}

/// Key of one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    /// Party the documents belong to.
    pub party_id: PartyId,
    /// Document kind.
    pub kind: DocumentKind,
}

/// Rendering rule for one document kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    prefix: String,
    width: usize,
    base: u64,
}

impl NumberFormat {
    /// Creates a format.
    #[must_use]
    pub fn new(prefix: impl Into<String>, width: usize, base: u64) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            base,
        }
    }

    /// Renders the `sequence`-th number (1-based).
    #[must_use]
    pub fn render(&self, sequence: u64) -> String {
        let value = self.base.saturating_add(sequence.saturating_sub(1));
        format!("{}{:0width$}", self.prefix, value, width = self.width)
    }
}

impl From<&NumberFormatConfig> for NumberFormat {
    fn from(config: &NumberFormatConfig) -> Self {
        Self::new(config.prefix.clone(), config.width, config.base)
    }
}

/// Number formats for every document kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numbering {
    invoice: NumberFormat,
    client_payment: NumberFormat,
    supplier_payment: NumberFormat,
    quote: NumberFormat,
    note: NumberFormat,
}

impl Numbering {
    /// Builds the formats from configuration.
    #[must_use]
    pub fn from_config(config: &NumberingConfig) -> Self {
        Self {
            invoice: NumberFormat::from(&config.invoice),
            client_payment: NumberFormat::from(&config.client_payment),
            supplier_payment: NumberFormat::from(&config.supplier_payment),
            quote: NumberFormat::from(&config.quote),
            note: NumberFormat::from(&config.note),
        }
    }

    /// Returns the format of `kind`.
    #[must_use]
    pub const fn format(&self, kind: DocumentKind) -> &NumberFormat {
        match kind {
            DocumentKind::Invoice => &self.invoice,
            DocumentKind::ClientPayment => &self.client_payment,
            DocumentKind::SupplierPayment => &self.supplier_payment,
            DocumentKind::Quote => &self.quote,
            DocumentKind::Note => &self.note,
        }
    }

    /// Draws the next number for `kind` on `party_id` inside `session`.
    pub async fn next_number<S>(
        &self,
        session: &mut S,
        party_id: PartyId,
        kind: DocumentKind,
    ) -> Result<String, LedgerError>
    where
        S: StoreSession,
    {
        let sequence = session.next_sequence(SequenceKey { party_id, kind }).await?;
        Ok(self.format(kind).render(sequence))
    }
}

impl Default for Numbering {
    fn default() -> Self {
        Self::from_config(&NumberingConfig::default())
    }
}
