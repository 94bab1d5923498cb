//! Property-based tests for party balance recomputation.
//!
//! Property 2: a party balance is a pure function of its stored documents.

use billfold_shared::types::{InvoiceId, NoteId, PartyId, UserId};
use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::recompute_balance;
use super::types::{Invoice, InvoiceType, Note, NoteStatus, NoteType, PaymentStatus};

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Invoice with a paid share between 0% and 120%.
fn invoice_strategy() -> impl Strategy<Value = Invoice> {
    (amount(), 0u32..=120).prop_map(|(total, percent)| {
        let amount_paid = (total * Decimal::from(percent) / Decimal::from(100)).round_dp(2);
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
    })
}

fn note_strategy() -> impl Strategy<Value = Note> {
    (
        prop_oneof![Just(NoteType::Credit), Just(NoteType::Debit)],
        prop_oneof![
            Just(NoteStatus::Pending),
            Just(NoteStatus::Applied),
            Just(NoteStatus::Voided)
        ],
        amount(),
    )
        .prop_map(|(note_type, status, total)| Note {
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
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 2.1: Recomputation matches the documented formula.
    ///
    /// *For any* set of invoices and notes, the balance SHALL equal the
    /// unpaid part of every invoice (negative when overpaid), minus applied
    /// credit notes, plus applied debit notes.
    #[test]
    fn prop_recompute_matches_formula(
        invoices in prop::collection::vec(invoice_strategy(), 0..20),
        notes in prop::collection::vec(note_strategy(), 0..10),
    ) {
        let mut expected = Decimal::ZERO;
        for invoice in &invoices {
            expected += invoice.total - invoice.amount_paid;
        }
        for note in notes.iter().filter(|n| n.status == NoteStatus::Applied) {
            match note.note_type {
                NoteType::Credit => expected -= note.total,
                NoteType::Debit => expected += note.total,
            }
        }

        prop_assert_eq!(recompute_balance(&invoices, &notes).unwrap(), expected);
    }

    /// Property 2.2: Recomputation ignores document order.
    ///
    /// *For any* documents, reversing both lists SHALL give the same balance.
    #[test]
    fn prop_recompute_order_independent(
        invoices in prop::collection::vec(invoice_strategy(), 0..20),
        notes in prop::collection::vec(note_strategy(), 0..10),
    ) {
        let forward = recompute_balance(&invoices, &notes).unwrap();

        let mut invoices = invoices;
        let mut notes = notes;
        invoices.reverse();
        notes.reverse();
        prop_assert_eq!(recompute_balance(&invoices, &notes).unwrap(), forward);
    }

    /// Property 2.3: Pending and voided notes never count.
    ///
    /// *For any* documents, adding a note that is not applied SHALL leave the
    /// balance unchanged.
    #[test]
    fn prop_unapplied_notes_ignored(
        invoices in prop::collection::vec(invoice_strategy(), 0..20),
        mut extra in note_strategy(),
        voided in any::<bool>(),
    ) {
        let before = recompute_balance(&invoices, &[]).unwrap();
        extra.status = if voided { NoteStatus::Voided } else { NoteStatus::Pending };
        prop_assert_eq!(recompute_balance(&invoices, &[extra]).unwrap(), before);
    }
}
