//! Account ledger domain types.
//!
//! An [`Account`] is the Cash or Bank ledger of one user. Its balance moves
//! only through immutable [`Transaction`] records, which live in their own
//! collection keyed by account id.

use std::fmt;

use billfold_shared::types::{AccountId, InvoiceId, TransactionId, TransferId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default bank name for bank accounts created without metadata.
pub const DEFAULT_BANK_NAME: &str = "Banco Principal";

/// Kind of account. Each user owns at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    /// Cash box.
    Cash,
    /// Bank account.
    Bank,
}

impl AccountKind {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Bank => "BANK",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(Self::Cash),
            "BANK" => Some(Self::Bank),
            _ => None,
        }
    }

    /// Category tagged on this account's leg of a transfer.
    ///
    /// The category names the counterpart account.
    #[must_use]
    pub const fn transfer_category(&self) -> Category {
        match self {
            Self::Cash => Category::BankTransfer,
            Self::Bank => Category::CashTransfer,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Bank => write!(f, "bank"),
        }
    }
}

/// Transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money in.
    Income,
    /// Money out.
    Expense,
    /// Transfer marker. Transfers are posted as an expense/income pair, so a
    /// transfer-typed row never moves a balance.
    Transfer,
}

impl TransactionType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::Transfer => "TRANSFER",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INCOME" => Some(Self::Income),
            "EXPENSE" => Some(Self::Expense),
            "TRANSFER" => Some(Self::Transfer),
            _ => None,
        }
    }
}

/// Transaction category.
///
/// Cash and bank accounts accept different subsets; see [`Category::allowed_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Sale collected in cash.
    Sale,
    /// Purchase paid in cash.
    Purchase,
    /// Payment to a supplier.
    SupplierPayment,
    /// Operating expense.
    Expense,
    /// Cash leg of a transfer to the bank.
    BankTransfer,
    /// Deposit.
    Deposit,
    /// Withdrawal.
    Withdrawal,
    /// Bank leg of a transfer to or from cash.
    CashTransfer,
    /// Collection from a customer into the bank.
    CustomerCollection,
    /// Anything else.
    Other,
}

impl Category {
    /// Categories accepted by cash accounts.
    pub const CASH: [Self; 8] = [
        Self::Sale,
        Self::Purchase,
        Self::SupplierPayment,
        Self::Expense,
        Self::BankTransfer,
        Self::Deposit,
        Self::Withdrawal,
        Self::Other,
    ];

    /// Categories accepted by bank accounts.
    pub const BANK: [Self; 6] = [
        Self::Deposit,
        Self::Withdrawal,
        Self::CashTransfer,
        Self::SupplierPayment,
        Self::CustomerCollection,
        Self::Other,
    ];

    /// Returns true if an account of `kind` accepts this category.
    #[must_use]
    pub fn allowed_for(&self, kind: AccountKind) -> bool {
        match kind {
            AccountKind::Cash => Self::CASH.contains(self),
            AccountKind::Bank => Self::BANK.contains(self),
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Purchase => "PURCHASE",
            Self::SupplierPayment => "SUPPLIER_PAYMENT",
            Self::Expense => "EXPENSE",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::CashTransfer => "CASH_TRANSFER",
            Self::CustomerCollection => "CUSTOMER_COLLECTION",
            Self::Other => "OTHER",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SALE" => Some(Self::Sale),
            "PURCHASE" => Some(Self::Purchase),
            "SUPPLIER_PAYMENT" => Some(Self::SupplierPayment),
            "EXPENSE" => Some(Self::Expense),
            "BANK_TRANSFER" => Some(Self::BankTransfer),
            "DEPOSIT" => Some(Self::Deposit),
            "WITHDRAWAL" => Some(Self::Withdrawal),
            "CASH_TRANSFER" => Some(Self::CashTransfer),
            "CUSTOMER_COLLECTION" => Some(Self::CustomerCollection),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Type of document a transaction points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// An invoice.
    Invoice,
    /// A purchase order.
    PurchaseOrder,
    /// A transfer; the id is the [`TransferId`].
    Transfer,
    /// Anything else.
    Other,
}

impl DocumentType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "INVOICE",
            Self::PurchaseOrder => "PURCHASE_ORDER",
            Self::Transfer => "TRANSFER",
            Self::Other => "OTHER",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INVOICE" => Some(Self::Invoice),
            "PURCHASE_ORDER" => Some(Self::PurchaseOrder),
            "TRANSFER" => Some(Self::Transfer),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Weak, lookup-only reference from a transaction to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedDocument {
    /// Referenced document type.
    pub document_type: DocumentType,
    /// Referenced document id.
    pub document_id: Uuid,
}

impl RelatedDocument {
    /// Reference to both legs of a transfer.
    #[must_use]
    pub const fn transfer(id: TransferId) -> Self {
        Self {
            document_type: DocumentType::Transfer,
            document_id: id.into_inner(),
        }
    }

    /// Reference to an invoice.
    #[must_use]
    pub const fn invoice(id: InvoiceId) -> Self {
        Self {
            document_type: DocumentType::Invoice,
            document_id: id.into_inner(),
        }
    }
}

/// Bank account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankAccountType {
    /// Checking account.
    #[default]
    Checking,
    /// Savings account.
    Savings,
}

impl BankAccountType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "CHECKING",
            Self::Savings => "SAVINGS",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CHECKING" => Some(Self::Checking),
            "SAVINGS" => Some(Self::Savings),
            _ => None,
        }
    }
}

/// Bank account metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    /// Account number at the bank.
    pub account_number: String,
    /// Bank name.
    pub bank_name: String,
    /// Checking or savings.
    pub account_type: BankAccountType,
}

impl BankDetails {
    /// Metadata used when a bank account is created without any.
    #[must_use]
    pub fn default_at(now: DateTime<Utc>) -> Self {
        Self {
            account_number: now.timestamp_millis().to_string(),
            bank_name: DEFAULT_BANK_NAME.to_string(),
            account_type: BankAccountType::Checking,
        }
    }
}

/// A cash or bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account id.
    pub id: AccountId,
    /// Owning user.
    pub owner: UserId,
    /// Cash or bank.
    pub kind: AccountKind,
    /// Running balance; equals the signed sum of the account's transactions.
    pub balance: Decimal,
    /// Bank metadata; `None` for cash accounts.
    pub bank: Option<BankDetails>,
    /// Last mutation time.
    pub last_updated: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates an empty account.
    #[must_use]
    pub fn open(
        owner: UserId,
        kind: AccountKind,
        bank: Option<BankDetails>,
        now: DateTime<Utc>,
    ) -> Self {
        let bank = match kind {
            AccountKind::Cash => None,
            AccountKind::Bank => Some(bank.unwrap_or_else(|| BankDetails::default_at(now))),
        };
        Self {
            id: AccountId::new(),
            owner,
            kind,
            balance: Decimal::ZERO,
            bank,
            last_updated: now,
            created_at: now,
        }
    }
}

/// One immutable posting against an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id.
    pub id: TransactionId,
    /// Account the transaction belongs to.
    pub account_id: AccountId,
    /// Income or expense.
    pub transaction_type: TransactionType,
    /// Positive amount.
    pub amount: Decimal,
    /// Free text.
    pub description: String,
    /// Category, valid for the account kind.
    pub category: Category,
    /// Optional link to the originating document.
    pub related_document: Option<RelatedDocument>,
    /// External reference such as a bank transaction or payment number.
    pub reference: Option<String>,
    /// Posting time.
    pub date: DateTime<Utc>,
}

/// Input for posting a transaction.
#[derive(Debug, Clone)]
pub struct PostTransactionInput {
    /// Income or expense.
    pub transaction_type: TransactionType,
    /// Amount (must be positive).
    pub amount: Decimal,
    /// Description (must not be empty).
    pub description: String,
    /// Category (must be valid for the account kind).
    pub category: Category,
    /// Optional related document.
    pub related_document: Option<RelatedDocument>,
    /// Optional external reference.
    pub reference: Option<String>,
}

/// Input for a transfer between a user's two accounts.
#[derive(Debug, Clone)]
pub struct TransferInput {
    /// Source account kind.
    pub from: AccountKind,
    /// Destination account kind.
    pub to: AccountKind,
    /// Amount (must be positive).
    pub amount: Decimal,
    /// Description shared by both legs.
    pub description: String,
}

/// An account snapshot together with the transaction that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posting {
    /// Account after the posting.
    pub account: Account,
    /// The new transaction.
    pub transaction: Transaction,
}

/// Result of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    /// Correlation id shared by both legs.
    pub transfer_id: TransferId,
    /// Expense leg on the source account.
    pub from: Posting,
    /// Income leg on the destination account.
    pub to: Posting,
}

/// An account with its ordered transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatement {
    /// The account.
    pub account: Account,
    /// Transactions, oldest first.
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Category::Sale, AccountKind::Cash, true)]
    #[case(Category::Sale, AccountKind::Bank, false)]
    #[case(Category::CustomerCollection, AccountKind::Bank, true)]
    #[case(Category::CustomerCollection, AccountKind::Cash, false)]
    #[case(Category::BankTransfer, AccountKind::Cash, true)]
    #[case(Category::CashTransfer, AccountKind::Bank, true)]
    #[case(Category::SupplierPayment, AccountKind::Cash, true)]
    #[case(Category::SupplierPayment, AccountKind::Bank, true)]
    #[case(Category::Other, AccountKind::Bank, true)]
    fn test_category_allowed_for(
        #[case] category: Category,
        #[case] kind: AccountKind,
        #[case] allowed: bool,
    ) {
        assert_eq!(category.allowed_for(kind), allowed);
    }

    #[test]
    fn test_storage_strings_parse_back() {
        for category in Category::CASH.iter().chain(Category::BANK.iter()) {
            assert_eq!(Category::parse(category.as_str()), Some(*category));
        }
        assert_eq!(AccountKind::parse("BANK"), Some(AccountKind::Bank));
        assert_eq!(TransactionType::parse("TRANSFER"), Some(TransactionType::Transfer));
        assert_eq!(DocumentType::parse("PURCHASE_ORDER"), Some(DocumentType::PurchaseOrder));
        assert_eq!(BankAccountType::parse("SAVINGS"), Some(BankAccountType::Savings));
        assert_eq!(Category::parse("VENTA"), None);
    }

    #[test]
    fn test_bank_account_gets_default_details() {
        let now = Utc::now();
        let account = Account::open(UserId::new(), AccountKind::Bank, None, now);
        let bank = account.bank.unwrap();
        assert_eq!(bank.bank_name, DEFAULT_BANK_NAME);
        assert_eq!(bank.account_type, BankAccountType::Checking);
        assert_eq!(bank.account_number, now.timestamp_millis().to_string());
        assert_eq!(account.balance, Decimal::ZERO);
    }

    #[test]
    fn test_cash_account_drops_bank_details() {
        let now = Utc::now();
        let details = BankDetails::default_at(now);
        let account = Account::open(UserId::new(), AccountKind::Cash, Some(details), now);
        assert!(account.bank.is_none());
    }

    #[test]
    fn test_transfer_category_names_counterpart() {
        assert_eq!(AccountKind::Cash.transfer_category(), Category::BankTransfer);
        assert_eq!(AccountKind::Bank.transfer_category(), Category::CashTransfer);
    }
}
