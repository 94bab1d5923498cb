//! Pure payment planning.
//!
//! [`plan_payment`] checks a payment against the party's invoices and
//! computes what each allocation will do, without touching the store. A
//! payment that plans successfully can only fail later on a store fault, a
//! missing account or (for suppliers) insufficient funds.

use std::collections::HashSet;

use billfold_shared::types::InvoiceId;
use rust_decimal::Decimal;

use super::types::NewPayment;
use crate::account::validation::validate_amount;
use crate::error::LedgerError;
use crate::party::{Invoice, PaymentStatus};

/// Effect of one allocation on its invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedAllocation {
    /// Target invoice.
    pub invoice_id: InvoiceId,
    /// Amount applied.
    pub amount: Decimal,
    /// Cumulative paid amount after the payment.
    pub amount_paid: Decimal,
    /// Status after the payment.
    pub status: PaymentStatus,
}

/// A validated payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPlan {
    /// Allocations in input order.
    pub allocations: Vec<PlannedAllocation>,
    /// Payment total, equal to the sum of the allocations.
    pub amount: Decimal,
}

impl PaymentPlan {
    /// Invoice the ledger posting points back to.
    #[must_use]
    pub fn primary_invoice(&self) -> Option<InvoiceId> {
        self.allocations.first().map(|a| a.invoice_id)
    }
}

/// Validates `input` against the party's `invoices`.
///
/// An allocation above the invoice's outstanding amount is accepted: the
/// invoice becomes paid and the excess is left as credit on the party.
///
/// # Errors
///
/// - `Validation` for a non-positive or out-of-range amount, no allocations,
///   a non-positive allocation or an invoice allocated twice
/// - `InvoiceNotFound` if an allocation targets an invoice not in `invoices`
/// - `InvoiceAlreadyPaid` if an allocation targets a paid invoice
/// - `AmountMismatch` if the allocations do not add up to the amount
pub fn plan_payment(input: &NewPayment, invoices: &[Invoice]) -> Result<PaymentPlan, LedgerError> {
    validate_amount(input.amount)?;
    if input.allocations.is_empty() {
        return Err(LedgerError::Validation(
            "a payment must be allocated to at least one invoice".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(input.allocations.len());
    let mut allocations = Vec::with_capacity(input.allocations.len());
    for allocation in &input.allocations {
        if allocation.amount <= Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "allocation to invoice {} must be positive, got {}",
                allocation.invoice_id, allocation.amount
            )));
        }
        validate_amount(allocation.amount)?;
        if !seen.insert(allocation.invoice_id) {
            return Err(LedgerError::Validation(format!(
                "invoice {} is allocated more than once",
                allocation.invoice_id
            )));
        }

        let invoice = invoices
            .iter()
            .find(|i| i.id == allocation.invoice_id)
            .ok_or(LedgerError::InvoiceNotFound(allocation.invoice_id))?;
        if invoice.payment_status == PaymentStatus::Paid {
            return Err(LedgerError::InvoiceAlreadyPaid(invoice.id));
        }

        let amount_paid = invoice
            .amount_paid
            .checked_add(allocation.amount)
            .ok_or_else(|| overflow(invoice.id))?;
        allocations.push(PlannedAllocation {
            invoice_id: invoice.id,
            amount: allocation.amount,
            amount_paid,
            status: PaymentStatus::after_payment(invoice.total, amount_paid),
        });
    }

    let allocated = allocations
        .iter()
        .try_fold(Decimal::ZERO, |sum, a| sum.checked_add(a.amount))
        .ok_or_else(|| LedgerError::Validation("allocations overflow".to_string()))?;
    if allocated != input.amount {
        return Err(LedgerError::AmountMismatch {
            amount: input.amount,
            allocated,
        });
    }

    Ok(PaymentPlan {
        allocations,
        amount: input.amount,
    })
}

fn overflow(invoice_id: InvoiceId) -> LedgerError {
    LedgerError::Validation(format!("paid amount of invoice {invoice_id} overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::party::InvoiceType;
    use crate::payment::types::{PaymentAllocation, PaymentMethod};
    use billfold_shared::types::{PartyId, UserId};
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

    fn payment(amount: Decimal, allocations: &[(InvoiceId, Decimal)]) -> NewPayment {
        NewPayment {
            date: Utc::now(),
            payment_method: PaymentMethod::Cash,
            amount,
            allocations: allocations
                .iter()
                .map(|&(invoice_id, amount)| PaymentAllocation { invoice_id, amount })
                .collect(),
            reference: None,
            observation: None,
        }
    }

    #[test]
    fn test_full_and_partial_allocations() {
        let a = invoice(dec!(500), dec!(0));
        let b = invoice(dec!(300), dec!(100));
        let plan = plan_payment(
            &payment(dec!(600), &[(a.id, dec!(500)), (b.id, dec!(100))]),
            &[a.clone(), b.clone()],
        )
        .unwrap();

        assert_eq!(plan.primary_invoice(), Some(a.id));
        assert_eq!(plan.allocations[0].status, PaymentStatus::Paid);
        assert_eq!(plan.allocations[1].status, PaymentStatus::Partial);
        assert_eq!(plan.allocations[1].amount_paid, dec!(200));
    }

    #[test]
    fn test_allocations_must_sum_to_amount() {
        let a = invoice(dec!(500), dec!(0));
        let result = plan_payment(&payment(dec!(500), &[(a.id, dec!(400))]), &[a]);
        match result {
            Err(LedgerError::AmountMismatch { amount, allocated }) => {
                assert_eq!(amount, dec!(500));
                assert_eq!(allocated, dec!(400));
            }
            other => panic!("expected AmountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_allocations_rejected() {
        let result = plan_payment(&payment(dec!(10), &[]), &[]);
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let a = invoice(dec!(500), dec!(0));
        let invoices = [a.clone()];
        assert!(matches!(
            plan_payment(&payment(dec!(0), &[(a.id, dec!(0))]), &invoices),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            plan_payment(&payment(dec!(10), &[(a.id, dec!(-10))]), &invoices),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_and_paid_invoices_rejected() {
        let paid = invoice(dec!(100), dec!(100));
        let stranger = InvoiceId::new();

        assert!(matches!(
            plan_payment(&payment(dec!(10), &[(stranger, dec!(10))]), &[paid.clone()]),
            Err(LedgerError::InvoiceNotFound(id)) if id == stranger
        ));
        assert!(matches!(
            plan_payment(&payment(dec!(10), &[(paid.id, dec!(10))]), &[paid.clone()]),
            Err(LedgerError::InvoiceAlreadyPaid(id)) if id == paid.id
        ));
    }

    #[test]
    fn test_duplicate_invoice_rejected() {
        let a = invoice(dec!(500), dec!(0));
        let result = plan_payment(
            &payment(dec!(200), &[(a.id, dec!(100)), (a.id, dec!(100))]),
            &[a],
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_over_allocation_settles_invoice() {
        let a = invoice(dec!(500), dec!(450));
        let plan = plan_payment(&payment(dec!(60), &[(a.id, dec!(60))]), &[a]).unwrap();
        assert_eq!(plan.allocations[0].amount_paid, dec!(510));
        assert_eq!(plan.allocations[0].status, PaymentStatus::Paid);
    }

    #[test]
    fn test_allocation_finer_than_four_decimals_rejected() {
        let a = invoice(dec!(500), dec!(0));
        let result = plan_payment(
            &payment(dec!(100.00001), &[(a.id, dec!(100.00001))]),
            &[a],
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }
}
