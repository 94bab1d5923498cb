//! Initial database migration.
//!
//! Creates the account ledger, party, document and sequence tables. Every
//! document table carries a `seq` column giving insertion order.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ACCOUNT LEDGER
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(ACCOUNT_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 2: PARTIES & DOCUMENTS
        // ============================================================
        db.execute_unprepared(PARTIES_SQL).await?;
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(NOTES_SQL).await?;
        db.execute_unprepared(QUOTES_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(PURCHASE_ORDERS_SQL).await?;

        // ============================================================
        // PART 3: NUMBERING
        // ============================================================
        db.execute_unprepared(DOCUMENT_SEQUENCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DROP_SQL)
            .await?;
        Ok(())
    }
}

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id              UUID PRIMARY KEY,
    owner_id        UUID NOT NULL,
    kind            VARCHAR(8) NOT NULL CHECK (kind IN ('CASH', 'BANK')),
    balance         NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (balance >= 0),
    bank_name       VARCHAR(255),
    bank_account_type VARCHAR(16),
    account_number  VARCHAR(64),
    last_updated    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_accounts_owner_kind UNIQUE (owner_id, kind)
);
";

const ACCOUNT_TRANSACTIONS_SQL: &str = r"
CREATE TABLE account_transactions (
    id                    UUID PRIMARY KEY,
    seq                   BIGSERIAL NOT NULL,
    account_id            UUID NOT NULL REFERENCES accounts(id) ON DELETE RESTRICT,
    transaction_type      VARCHAR(16) NOT NULL CHECK (transaction_type IN ('INCOME', 'EXPENSE', 'TRANSFER')),
    amount                NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    description           TEXT NOT NULL,
    category              VARCHAR(32) NOT NULL,
    related_document_type VARCHAR(32),
    related_document_id   UUID,
    reference             VARCHAR(255),
    date                  TIMESTAMPTZ NOT NULL
);

CREATE INDEX idx_account_transactions_account ON account_transactions(account_id, seq);
CREATE INDEX idx_account_transactions_related ON account_transactions(related_document_id)
    WHERE related_document_id IS NOT NULL;
";

const PARTIES_SQL: &str = r"
CREATE TABLE parties (
    id                 UUID PRIMARY KEY,
    owner_id           UUID NOT NULL,
    kind               VARCHAR(16) NOT NULL CHECK (kind IN ('CLIENT', 'SUPPLIER')),
    business_name      VARCHAR(255) NOT NULL,
    fantasy_name       VARCHAR(255),
    tax_id             VARCHAR(32) NOT NULL,
    credit_limit       NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (credit_limit >= 0),
    balance            NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance_updated_at TIMESTAMPTZ,
    is_active          BOOLEAN NOT NULL DEFAULT TRUE,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_parties_kind_tax_id UNIQUE (kind, tax_id)
);

CREATE INDEX idx_parties_owner ON parties(owner_id);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id             UUID PRIMARY KEY,
    seq            BIGSERIAL NOT NULL,
    party_id       UUID NOT NULL REFERENCES parties(id) ON DELETE RESTRICT,
    invoice_number VARCHAR(64) NOT NULL,
    invoice_type   VARCHAR(1) NOT NULL,
    date           TIMESTAMPTZ NOT NULL,
    due_date       TIMESTAMPTZ,
    items          JSONB NOT NULL DEFAULT '[]',
    total          NUMERIC(19, 4) NOT NULL CHECK (total > 0),
    amount_paid    NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (amount_paid >= 0),
    payment_status VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    observation    TEXT,
    created_by     UUID NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_invoices_party_number UNIQUE (party_id, invoice_number)
);

CREATE INDEX idx_invoices_party ON invoices(party_id, seq);
";

const NOTES_SQL: &str = r"
CREATE TABLE notes (
    id              UUID PRIMARY KEY,
    seq             BIGSERIAL NOT NULL,
    party_id        UUID NOT NULL REFERENCES parties(id) ON DELETE RESTRICT,
    note_number     VARCHAR(64) NOT NULL,
    note_type       VARCHAR(8) NOT NULL CHECK (note_type IN ('CREDIT', 'DEBIT')),
    related_invoice UUID NOT NULL,
    date            TIMESTAMPTZ NOT NULL,
    reason          TEXT,
    items           JSONB NOT NULL DEFAULT '[]',
    total           NUMERIC(19, 4) NOT NULL CHECK (total > 0),
    status          VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    created_by      UUID NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_notes_party_number UNIQUE (party_id, note_number)
);

CREATE INDEX idx_notes_party ON notes(party_id, seq);
";

const QUOTES_SQL: &str = r"
CREATE TABLE quotes (
    id           UUID PRIMARY KEY,
    seq          BIGSERIAL NOT NULL,
    party_id     UUID NOT NULL REFERENCES parties(id) ON DELETE RESTRICT,
    quote_number VARCHAR(64) NOT NULL,
    date         TIMESTAMPTZ NOT NULL,
    valid_until  TIMESTAMPTZ NOT NULL,
    items        JSONB NOT NULL DEFAULT '[]',
    total        NUMERIC(19, 4) NOT NULL CHECK (total > 0),
    status       VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    invoice_id   UUID REFERENCES invoices(id),
    observation  TEXT,
    created_by   UUID NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_quotes_party_number UNIQUE (party_id, quote_number)
);

CREATE INDEX idx_quotes_party ON quotes(party_id, seq);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id             UUID PRIMARY KEY,
    seq            BIGSERIAL NOT NULL,
    party_id       UUID NOT NULL REFERENCES parties(id) ON DELETE RESTRICT,
    payment_number VARCHAR(64) NOT NULL,
    date           TIMESTAMPTZ NOT NULL,
    payment_method VARCHAR(16) NOT NULL,
    amount         NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    allocations    JSONB NOT NULL,
    reference      VARCHAR(255),
    observation    TEXT,
    transaction_id UUID REFERENCES account_transactions(id),
    created_by     UUID NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_payments_party_number UNIQUE (party_id, payment_number)
);

CREATE INDEX idx_payments_party ON payments(party_id, seq);
";

const PURCHASE_ORDERS_SQL: &str = r"
CREATE TABLE purchase_orders (
    id                     UUID PRIMARY KEY,
    seq                    BIGSERIAL NOT NULL,
    party_id               UUID NOT NULL REFERENCES parties(id) ON DELETE RESTRICT,
    order_number           VARCHAR(64) NOT NULL,
    date                   TIMESTAMPTZ NOT NULL,
    expected_delivery_date TIMESTAMPTZ,
    items                  JSONB NOT NULL DEFAULT '[]',
    total                  NUMERIC(19, 4) NOT NULL CHECK (total > 0),
    status                 VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    created_by             UUID NOT NULL,
    created_at             TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_purchase_orders_party_number UNIQUE (party_id, order_number)
);

CREATE INDEX idx_purchase_orders_party ON purchase_orders(party_id, seq);
";

const DOCUMENT_SEQUENCES_SQL: &str = r"
CREATE TABLE document_sequences (
    scope_id   UUID NOT NULL,
    kind       VARCHAR(32) NOT NULL,
    last_value BIGINT NOT NULL CHECK (last_value > 0),

    PRIMARY KEY (scope_id, kind)
);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS document_sequences CASCADE;
DROP TABLE IF EXISTS purchase_orders CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS quotes CASCADE;
DROP TABLE IF EXISTS notes CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS parties CASCADE;
DROP TABLE IF EXISTS account_transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
";
