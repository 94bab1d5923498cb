//! Input validation for parties and their documents.

use rust_decimal::Decimal;

use super::types::{LineItem, NewParty, PartyKind, PartyUpdate};
use crate::account::validation::{validate_amount, validate_money};
use crate::error::LedgerError;

/// Returns true if `cuit` has the `NN-NNNNNNNN-N` shape.
#[must_use]
pub fn is_valid_cuit(cuit: &str) -> bool {
    let parts: Vec<&str> = cuit.split('-').collect();
    matches!(parts.as_slice(), [a, b, c]
        if a.len() == 2 && b.len() == 8 && c.len() == 1
            && [a, b, c].iter().all(|p| p.bytes().all(|byte| byte.is_ascii_digit())))
}

fn validate_business_name(name: &str) -> Result<(), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "business name is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_credit_limit(limit: Decimal) -> Result<(), LedgerError> {
    if limit < Decimal::ZERO {
        return Err(LedgerError::Validation(
            "credit limit cannot be negative".to_string(),
        ));
    }
    validate_money(limit)
}

/// Validates a new client or supplier.
pub fn validate_new_party(kind: PartyKind, input: &NewParty) -> Result<(), LedgerError> {
    validate_business_name(&input.business_name)?;
    if input.tax_id.trim().is_empty() {
        return Err(LedgerError::Validation(match kind {
            PartyKind::Client => "document number is required".to_string(),
            PartyKind::Supplier => "CUIT is required".to_string(),
        }));
    }
    if kind == PartyKind::Supplier && !is_valid_cuit(&input.tax_id) {
        return Err(LedgerError::Validation(format!(
            "invalid CUIT format (expected XX-XXXXXXXX-X): {}",
            input.tax_id
        )));
    }
    validate_credit_limit(input.credit_limit)
}

/// Validates the fields an update sets. Absent fields are left alone.
pub fn validate_party_update(update: &PartyUpdate) -> Result<(), LedgerError> {
    if let Some(name) = &update.business_name {
        validate_business_name(name)?;
    }
    if let Some(limit) = update.credit_limit {
        validate_credit_limit(limit)?;
    }
    Ok(())
}

/// Validates the lines and total shared by every document kind.
pub fn validate_document(items: &[LineItem], total: Decimal) -> Result<(), LedgerError> {
    if items.is_empty() {
        return Err(LedgerError::Validation(
            "at least one line item is required".to_string(),
        ));
    }
    for item in items {
        if item.description.trim().is_empty() {
            return Err(LedgerError::Validation(
                "line item description is required".to_string(),
            ));
        }
        if item.quantity <= Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "line item quantity must be positive, got {}",
                item.quantity
            )));
        }
        if item.unit_price < Decimal::ZERO || item.subtotal < Decimal::ZERO {
            return Err(LedgerError::Validation(
                "line item amounts cannot be negative".to_string(),
            ));
        }
    }
    validate_amount(total)
}

/// Validates a caller-supplied document number.
pub fn validate_document_number(label: &str, number: &str) -> Result<(), LedgerError> {
    if number.trim().is_empty() {
        return Err(LedgerError::Validation(format!("{label} is required")));
    }
    Ok(())
}
