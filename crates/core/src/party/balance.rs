//! Party balance math.
//!
//! The balance of a party is a pure function of its stored documents:
//!
//! ```text
//! balance = Σ (total - amount_paid) over invoices
//!         - Σ total(note) for APPLIED credit notes
//!         + Σ total(note) for APPLIED debit notes
//! ```
//!
//! A settled invoice contributes nothing; an overpaid one contributes the
//! excess as credit, which mirrors the `-amount` a payment applies to the
//! stored balance.

use rust_decimal::Decimal;

use super::types::{Invoice, Note, NoteStatus, NoteType, Party};
use crate::error::LedgerError;

/// Recomputes a party balance from its invoices and notes.
///
/// # Errors
///
/// Returns `Validation` if the documents add up to more than a `Decimal`
/// can hold.
pub fn recompute_balance(invoices: &[Invoice], notes: &[Note]) -> Result<Decimal, LedgerError> {
    invoices
        .iter()
        .try_fold(Decimal::ZERO, |sum, invoice| sum.checked_add(invoice.net_due()))
        .and_then(|outstanding| {
            notes
                .iter()
                .filter(|note| note.status == NoteStatus::Applied)
                .try_fold(outstanding, |balance, note| match note.note_type {
                    NoteType::Credit => balance.checked_sub(note.total),
                    NoteType::Debit => balance.checked_add(note.total),
                })
        })
        .ok_or_else(|| LedgerError::Validation("party balance out of range".to_string()))
}

/// Returns true if an invoice of `amount` fits within the party's credit limit.
///
/// A credit limit of zero means unlimited.
#[must_use]
pub fn can_create_invoice(party: &Party, amount: Decimal) -> bool {
    party.credit_limit.is_zero()
        || party
            .balance
            .current
            .checked_add(amount)
            .is_some_and(|total| total <= party.credit_limit)
}

/// Like [`can_create_invoice`], returning `CreditLimitExceeded` on failure.
pub fn check_credit_limit(party: &Party, amount: Decimal) -> Result<(), LedgerError> {
    if can_create_invoice(party, amount) {
        Ok(())
    } else {
        Err(LedgerError::CreditLimitExceeded {
            limit: party.credit_limit,
            current: party.balance.current,
            requested: amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::party::types::{InvoiceType, PartyBalance, PartyKind, PaymentStatus};
    use billfold_shared::types::{InvoiceId, NoteId, PartyId, UserId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn invoice(total: Decimal, amount_paid: Decimal) -> Invoice {
        Invoice {
            id: InvoiceId::new(),
            party_id: PartyId::new(),
            invoice_number: "001000".to_string(),
            invoice_type: InvoiceType::B,
            date: Utc::now(),
            due_date: None,
            items: Vec::new(),
            total,
            amount_paid,
            payment_status: PaymentStatus::after_payment(total, amount_paid),
            observation: None,
            created_by: UserId::new(),
            created_at: Utc::now(),
        }
    }

    fn note(note_type: NoteType, status: NoteStatus, total: Decimal) -> Note {
        Note {
            id: NoteId::new(),
            party_id: PartyId::new(),
            note_number: "00001".to_string(),
            note_type,
            related_invoice: InvoiceId::new(),
            date: Utc::now(),
            reason: None,
            items: Vec::new(),
            total,
            status,
            created_by: UserId::new(),
            created_at: Utc::now(),
        }
    }

    fn party(credit_limit: Decimal, current: Decimal) -> Party {
        Party {
            id: PartyId::new(),
            owner: UserId::new(),
            kind: PartyKind::Client,
            business_name: "Acme".to_string(),
            fantasy_name: None,
            tax_id: "20123456".to_string(),
            credit_limit,
            balance: PartyBalance {
                current,
                last_update: None,
            },
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_unpaid_invoices_count() {
        let invoices = vec![
            invoice(dec!(500), dec!(0)),
            invoice(dec!(300), dec!(300)),
            invoice(dec!(200), dec!(0)),
        ];
        assert_eq!(recompute_balance(&invoices, &[]).unwrap(), dec!(700));
    }

    #[test]
    fn test_overpaid_invoice_counts_as_credit() {
        let invoices = vec![invoice(dec!(500), dec!(600)), invoice(dec!(200), dec!(0))];
        assert_eq!(recompute_balance(&invoices, &[]).unwrap(), dec!(100));
    }

    #[test]
    fn test_partial_invoice_counts_outstanding_part() {
        let invoices = vec![invoice(dec!(500), dec!(120))];
        assert_eq!(recompute_balance(&invoices, &[]).unwrap(), dec!(380));
    }

    #[test]
    fn test_only_applied_notes_count() {
        let invoices = vec![invoice(dec!(1000), dec!(0))];
        let notes = vec![
            note(NoteType::Credit, NoteStatus::Applied, dec!(150)),
            note(NoteType::Debit, NoteStatus::Applied, dec!(40)),
            note(NoteType::Credit, NoteStatus::Pending, dec!(999)),
            note(NoteType::Debit, NoteStatus::Voided, dec!(999)),
        ];
        assert_eq!(recompute_balance(&invoices, &notes).unwrap(), dec!(890));
    }

    #[test]
    fn test_credit_notes_can_make_balance_negative() {
        let notes = vec![note(NoteType::Credit, NoteStatus::Applied, dec!(75))];
        assert_eq!(recompute_balance(&[], &notes).unwrap(), dec!(-75));
    }

    #[test]
    fn test_balance_overflow_is_an_error() {
        let invoices = vec![invoice(Decimal::MAX, dec!(0)), invoice(dec!(1), dec!(0))];
        assert!(matches!(
            recompute_balance(&invoices, &[]),
            Err(LedgerError::Validation(_))
        ));

        let notes = vec![note(NoteType::Debit, NoteStatus::Applied, dec!(1))];
        assert!(recompute_balance(&invoices[..1], &notes).is_err());
        assert!(!can_create_invoice(&party(dec!(1), Decimal::MAX), dec!(1)));
    }

    #[test]
    fn test_zero_credit_limit_is_unlimited() {
        assert!(can_create_invoice(&party(dec!(0), dec!(1000000)), dec!(1000000)));
    }

    #[test]
    fn test_credit_limit_boundary() {
        let party = party(dec!(1000), dec!(900));
        assert!(can_create_invoice(&party, dec!(100)));
        assert!(!can_create_invoice(&party, dec!(100.01)));
        assert!(matches!(
            check_credit_limit(&party, dec!(200)),
            Err(LedgerError::CreditLimitExceeded { .. })
        ));
    }
}
