//! Property-based tests for payment planning.
//!
//! Property 3: a payment against open invoices plans successfully exactly
//! when its allocations add up to its amount.

use billfold_shared::types::{InvoiceId, PartyId, UserId};
use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::plan::plan_payment;
use super::types::{NewPayment, PaymentAllocation, PaymentMethod};
use crate::error::LedgerError;
use crate::party::{Invoice, InvoiceType, PaymentStatus};

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

fn invoice(total: Decimal) -> Invoice {
    Invoice {
        id: InvoiceId::new(),
        party_id: PartyId::new(),
        invoice_number: "001000".to_string(),
        invoice_type: InvoiceType::B,
        date: Utc::now(),
        due_date: None,
        items: Vec::new(),
        total,
        amount_paid: Decimal::ZERO,
        payment_status: PaymentStatus::Pending,
        observation: None,
        created_by: UserId::new(),
        created_at: Utc::now(),
    }
}

/// Invoice totals with an allocation of up to one and a half times the total.
fn invoices_with_allocations() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec(
        (1i64..100_000).prop_flat_map(|total| (Just(total), 1..=total + total / 2)),
        1..8,
    )
}

fn payment(amount: Decimal, allocations: Vec<PaymentAllocation>) -> NewPayment {
    NewPayment {
        date: Utc::now(),
        payment_method: PaymentMethod::Transfer,
        amount,
        allocations,
        reference: None,
        observation: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 3.1: Allocations that sum to the amount always plan.
    ///
    /// *For any* open invoices and positive allocations, overpaying ones
    /// included, the plan SHALL succeed and mark an invoice PAID exactly when
    /// its allocation covers the total.
    #[test]
    fn prop_fitting_payment_plans(pairs in invoices_with_allocations()) {
        let invoices: Vec<Invoice> = pairs.iter().map(|&(total, _)| invoice(cents(total))).collect();
        let allocations: Vec<PaymentAllocation> = invoices
            .iter()
            .zip(&pairs)
            .map(|(inv, &(_, paid))| PaymentAllocation { invoice_id: inv.id, amount: cents(paid) })
            .collect();
        let amount: Decimal = allocations.iter().map(|a| a.amount).sum();

        let plan = plan_payment(&payment(amount, allocations), &invoices);
        prop_assert!(plan.is_ok());
        let plan = plan.unwrap();
        prop_assert_eq!(plan.amount, amount);
        for (planned, &(total, paid)) in plan.allocations.iter().zip(&pairs) {
            let expected = if paid >= total { PaymentStatus::Paid } else { PaymentStatus::Partial };
            prop_assert_eq!(planned.status, expected);
        }
    }

    /// Property 3.2: Any other declared amount is a mismatch.
    ///
    /// *For any* fitting allocations, declaring a different positive amount
    /// SHALL fail with `AmountMismatch` reporting the allocated sum.
    #[test]
    fn prop_wrong_amount_is_mismatch(
        pairs in invoices_with_allocations(),
        offset in prop_oneof![-50i64..0, 1i64..50],
    ) {
        let invoices: Vec<Invoice> = pairs.iter().map(|&(total, _)| invoice(cents(total))).collect();
        let allocations: Vec<PaymentAllocation> = invoices
            .iter()
            .zip(&pairs)
            .map(|(inv, &(_, paid))| PaymentAllocation { invoice_id: inv.id, amount: cents(paid) })
            .collect();
        let allocated: Decimal = allocations.iter().map(|a| a.amount).sum();
        let declared = allocated + cents(offset);
        prop_assume!(declared > Decimal::ZERO);

        match plan_payment(&payment(declared, allocations), &invoices) {
            Err(LedgerError::AmountMismatch { amount, allocated: reported }) => {
                prop_assert_eq!(amount, declared);
                prop_assert_eq!(reported, allocated);
            }
            other => prop_assert!(false, "expected AmountMismatch, got {:?}", other),
        }
    }
}
