//! Account ledger service.
//!
//! Every public operation runs in one store session: validation first, then
//! the locked reads and field-level updates, then commit. Any error rolls the
//! whole session back, so a rejected posting or transfer leaves balances and
//! logs untouched.

use billfold_shared::types::{TransactionId, TransferId, UserId};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use super::balance::signed_amount;
use super::types::{
    Account, AccountKind, AccountStatement, BankDetails, PostTransactionInput, Posting,
    RelatedDocument, Transaction, TransactionType, TransferInput, TransferReceipt,
};
use super::validation::{validate_posting, validate_transfer};
use crate::error::LedgerError;
use crate::store::{LedgerStore, StoreSession, finish};

/// Cash and bank ledger operations.
#[derive(Debug, Clone)]
pub struct AccountLedger<S> {
    store: S,
}

impl<S: LedgerStore> AccountLedger<S> {
    /// Creates a ledger over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates the user's account of `kind` with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the user already has an account of that kind.
    #[instrument(skip(self, bank), fields(owner = %owner, kind = %kind))]
    pub async fn initialize(
        &self,
        owner: UserId,
        kind: AccountKind,
        bank: Option<BankDetails>,
    ) -> Result<Account, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = initialize_in(&mut session, owner, kind, bank, Utc::now()).await;
        let account = finish(session, result).await?;

        info!(account_id = %account.id, "Account initialized");
        Ok(account)
    }

    /// Returns the user's cash and bank accounts, creating any that is missing.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn ensure_accounts(&self, owner: UserId) -> Result<(Account, Account), LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let now = Utc::now();
            let cash = ensure_in(&mut session, owner, AccountKind::Cash, now).await?;
            let bank = ensure_in(&mut session, owner, AccountKind::Bank, now).await?;
            Ok::<_, LedgerError>((cash, bank))
        }
        .await;
        finish(session, result).await
    }

    /// Returns the account with its transaction log.
    pub async fn statement(
        &self,
        owner: UserId,
        kind: AccountKind,
    ) -> Result<AccountStatement, LedgerError> {
        let mut session = self.store.begin().await?;
        let result = async {
            let account = require_account(&mut session, owner, kind).await?;
            let transactions = session.transactions(account.id).await?;
            Ok::<_, LedgerError>(AccountStatement {
                account,
                transactions,
            })
        }
        .await;
        finish(session, result).await
    }

    /// Posts an income or expense to the user's account of `kind`.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive amount, blank description, transfer
    ///   type or a category the account kind does not accept
    /// - `AccountNotFound` if the account does not exist
    /// - `InsufficientFunds` if an expense exceeds the balance
    #[instrument(skip(self, input), fields(owner = %owner, kind = %kind, amount = %input.amount))]
    pub async fn post_transaction(
        &self,
        owner: UserId,
        kind: AccountKind,
        input: PostTransactionInput,
    ) -> Result<Posting, LedgerError> {
        validate_posting(kind, &input)?;

        let mut session = self.store.begin().await?;
        let result = async {
            let account = require_account(&mut session, owner, kind).await?;
            let now = Utc::now();
            post(&mut session, &account, input, now, now).await
        }
        .await;
        let posting = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Posting rejected"))?;

        info!(
            transaction_id = %posting.transaction.id,
            balance = %posting.account.balance,
            "Transaction posted"
        );
        Ok(posting)
    }

    /// Moves money between the user's cash and bank accounts.
    ///
    /// Both legs share one [`TransferId`]; either both are posted or neither.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive amount, blank description or
    ///   identical source and destination
    /// - `AccountNotFound` if either account does not exist
    /// - `InsufficientFunds` if the source balance is below the amount
    #[instrument(skip(self, input), fields(owner = %owner, from = %input.from, to = %input.to, amount = %input.amount))]
    pub async fn transfer(
        &self,
        owner: UserId,
        input: TransferInput,
    ) -> Result<TransferReceipt, LedgerError> {
        validate_transfer(&input)?;

        let mut session = self.store.begin().await?;
        let result = transfer_in(&mut session, owner, &input, Utc::now()).await;
        let receipt = finish(session, result)
            .await
            .inspect_err(|err| warn!(error_code = err.error_code(), "Transfer rejected"))?;

        info!(transfer_id = %receipt.transfer_id, "Transfer completed");
        Ok(receipt)
    }
}

async fn initialize_in<T: StoreSession>(
    session: &mut T,
    owner: UserId,
    kind: AccountKind,
    bank: Option<BankDetails>,
    now: DateTime<Utc>,
) -> Result<Account, LedgerError> {
    if session.lock_account(owner, kind).await?.is_some() {
        return Err(LedgerError::AlreadyExists(format!(
            "{kind} account for user {owner}"
        )));
    }
    let account = Account::open(owner, kind, bank, now);
    session.insert_account(&account).await?;
    Ok(account)
}

async fn ensure_in<T: StoreSession>(
    session: &mut T,
    owner: UserId,
    kind: AccountKind,
    now: DateTime<Utc>,
) -> Result<Account, LedgerError> {
    if let Some(account) = session.lock_account(owner, kind).await? {
        return Ok(account);
    }
    let account = Account::open(owner, kind, None, now);
    if session.insert_account_if_absent(&account).await? {
        return Ok(account);
    }
    // A concurrent session created it first.
    require_account(session, owner, kind).await
}

/// Reads and locks the user's account of `kind`.
pub(crate) async fn require_account<T: StoreSession>(
    session: &mut T,
    owner: UserId,
    kind: AccountKind,
) -> Result<Account, LedgerError> {
    session
        .lock_account(owner, kind)
        .await?
        .ok_or(LedgerError::AccountNotFound { owner, kind })
}

/// Applies a validated posting to a locked account.
///
/// The transaction is dated `date`; the account's `last_updated` is `now`.
pub(crate) async fn post<T: StoreSession>(
    session: &mut T,
    account: &Account,
    input: PostTransactionInput,
    date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Posting, LedgerError> {
    let delta = signed_amount(input.transaction_type, input.amount);
    let balance = session
        .adjust_account_balance(account.id, delta, now)
        .await?
        .ok_or(LedgerError::InsufficientFunds {
            available: account.balance,
            requested: input.amount,
        })?;

    let transaction = Transaction {
        id: TransactionId::new(),
        account_id: account.id,
        transaction_type: input.transaction_type,
        amount: input.amount,
        description: input.description,
        category: input.category,
        related_document: input.related_document,
        reference: input.reference,
        date,
    };
    session.append_transaction(&transaction).await?;

    Ok(Posting {
        account: Account {
            balance,
            last_updated: now,
            ..account.clone()
        },
        transaction,
    })
}

async fn transfer_in<T: StoreSession>(
    session: &mut T,
    owner: UserId,
    input: &TransferInput,
    now: DateTime<Utc>,
) -> Result<TransferReceipt, LedgerError> {
    // Lock order: cash, then bank.
    let cash = require_account(session, owner, AccountKind::Cash).await?;
    let bank = require_account(session, owner, AccountKind::Bank).await?;
    let (source, destination) = match input.from {
        AccountKind::Cash => (cash, bank),
        AccountKind::Bank => (bank, cash),
    };

    let transfer_id = TransferId::new();
    let leg = |transaction_type, kind: AccountKind| PostTransactionInput {
        transaction_type,
        amount: input.amount,
        description: input.description.clone(),
        category: kind.transfer_category(),
        related_document: Some(RelatedDocument::transfer(transfer_id)),
        reference: None,
    };

    let from = post(
        session,
        &source,
        leg(TransactionType::Expense, source.kind),
        now,
        now,
    )
    .await?;
    let to = post(
        session,
        &destination,
        leg(TransactionType::Income, destination.kind),
        now,
        now,
    )
    .await?;

    Ok(TransferReceipt {
        transfer_id,
        from,
        to,
    })
}
