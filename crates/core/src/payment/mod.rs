//! Payment reconciliation against invoices, party balances and accounts.

pub mod plan;
pub mod service;
pub mod types;

#[cfg(test)]
mod plan_props;

pub use plan::{PaymentPlan, PlannedAllocation, plan_payment};
pub use service::PaymentReconciler;
pub use types::{NewPayment, Payment, PaymentAllocation, PaymentMethod, PaymentReceipt};
