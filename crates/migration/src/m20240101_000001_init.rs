//! Initial schema of the accounts service.
//!
//! - `account_types` / `card_types`: product types carrying the currency
//! - `accounts` / `cards`: money holders owned by users
//! - `revenue_accounts`: fee and margin collectors, one default per currency
//! - `requests`: transfer requests and their lifecycle status
//! - `transactions`: signed legs produced by a request
//! - `limits`: per-user caps checked before money moves
//!
//! Money columns are decimal strings so no precision is lost in SQLite.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum AccountTypes {
    Table,
    Id,
    Name,
    CurrencyCode,
}

#[derive(Iden)]
enum CardTypes {
    Table,
    Id,
    Name,
    CurrencyCode,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Number,
    TypeId,
    UserId,
    IsActive,
    AllowWithdrawals,
    AllowDeposits,
    Balance,
    AvailableAmount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Cards {
    Table,
    Id,
    Number,
    CardTypeId,
    UserId,
    Balance,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum RevenueAccounts {
    Table,
    Id,
    CurrencyCode,
    Balance,
    AvailableAmount,
    IsDefault,
}

#[derive(Iden)]
enum Requests {
    Table,
    Id,
    UserId,
    Status,
    Subject,
    BaseCurrencyCode,
    ReferenceCurrencyCode,
    Rate,
    RateDesignation,
    Amount,
    InputAmount,
    Description,
    CancellationReason,
    Input,
    CreatedAt,
    StatusChangedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    RequestId,
    AccountId,
    CardId,
    RevenueAccountId,
    Status,
    Description,
    Amount,
    ShowAmount,
    AvailableBalanceSnapshot,
    ShowAvailableBalanceSnapshot,
    CurrentBalanceSnapshot,
    ShowCurrentBalanceSnapshot,
    IsVisible,
    #[iden = "type"]
    Kind,
    Purpose,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Limits {
    Table,
    Id,
    Name,
    Entity,
    EntityId,
    CurrencyCode,
    Amount,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Types
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AccountTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountTypes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccountTypes::Name).string().not_null())
                    .col(ColumnDef::new(AccountTypes::CurrencyCode).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CardTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CardTypes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CardTypes::Name).string().not_null())
                    .col(ColumnDef::new(CardTypes::CurrencyCode).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Number).string().not_null())
                    .col(ColumnDef::new(Accounts::TypeId).big_integer().not_null())
                    .col(ColumnDef::new(Accounts::UserId).string().not_null())
                    .col(ColumnDef::new(Accounts::IsActive).boolean())
                    .col(ColumnDef::new(Accounts::AllowWithdrawals).boolean())
                    .col(ColumnDef::new(Accounts::AllowDeposits).boolean())
                    .col(
                        ColumnDef::new(Accounts::Balance)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(Accounts::AvailableAmount)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-type_id")
                            .from(Accounts::Table, Accounts::TypeId)
                            .to(AccountTypes::Table, AccountTypes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-number-unique")
                    .table(Accounts::Table)
                    .col(Accounts::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-user_id")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Cards
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Cards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cards::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cards::Number).string().not_null())
                    .col(ColumnDef::new(Cards::CardTypeId).big_integer().not_null())
                    .col(ColumnDef::new(Cards::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Cards::Balance)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(Cards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-cards-card_type_id")
                            .from(Cards::Table, Cards::CardTypeId)
                            .to(CardTypes::Table, CardTypes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Revenue accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RevenueAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RevenueAccounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RevenueAccounts::CurrencyCode)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RevenueAccounts::Balance)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(RevenueAccounts::AvailableAmount)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(RevenueAccounts::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-revenue_accounts-currency_code")
                    .table(RevenueAccounts::Table)
                    .col(RevenueAccounts::CurrencyCode)
                    .col(RevenueAccounts::IsDefault)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Requests
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Requests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Requests::UserId).string().not_null())
                    .col(ColumnDef::new(Requests::Status).string().not_null())
                    .col(ColumnDef::new(Requests::Subject).string().not_null())
                    .col(
                        ColumnDef::new(Requests::BaseCurrencyCode)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Requests::ReferenceCurrencyCode)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Requests::Rate).string())
                    .col(
                        ColumnDef::new(Requests::RateDesignation)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Requests::Amount).string())
                    .col(ColumnDef::new(Requests::InputAmount).string())
                    .col(ColumnDef::new(Requests::Description).string())
                    .col(ColumnDef::new(Requests::CancellationReason).string())
                    .col(ColumnDef::new(Requests::Input).text())
                    .col(
                        ColumnDef::new(Requests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Requests::StatusChangedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Requests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-requests-user_id-status")
                    .table(Requests::Table)
                    .col(Requests::UserId)
                    .col(Requests::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::RequestId).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::AccountId).big_integer())
                    .col(ColumnDef::new(Transactions::CardId).big_integer())
                    .col(ColumnDef::new(Transactions::RevenueAccountId).big_integer())
                    .col(ColumnDef::new(Transactions::Status).string().not_null())
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::Amount).string().not_null())
                    .col(ColumnDef::new(Transactions::ShowAmount).string())
                    .col(ColumnDef::new(Transactions::AvailableBalanceSnapshot).string())
                    .col(ColumnDef::new(Transactions::ShowAvailableBalanceSnapshot).string())
                    .col(ColumnDef::new(Transactions::CurrentBalanceSnapshot).string())
                    .col(ColumnDef::new(Transactions::ShowCurrentBalanceSnapshot).string())
                    .col(
                        ColumnDef::new(Transactions::IsVisible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::Purpose).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-request_id")
                            .from(Transactions::Table, Transactions::RequestId)
                            .to(Requests::Table, Requests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-card_id")
                            .from(Transactions::Table, Transactions::CardId)
                            .to(Cards::Table, Cards::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-revenue_account_id")
                            .from(Transactions::Table, Transactions::RevenueAccountId)
                            .to(RevenueAccounts::Table, RevenueAccounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-request_id")
                    .table(Transactions::Table)
                    .col(Transactions::RequestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Limits
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Limits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Limits::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Limits::Name).string().not_null())
                    .col(ColumnDef::new(Limits::Entity).string().not_null())
                    .col(ColumnDef::new(Limits::EntityId).string().not_null())
                    .col(ColumnDef::new(Limits::CurrencyCode).string())
                    .col(ColumnDef::new(Limits::Amount).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-limits-name-entity-entity_id-unique")
                    .table(Limits::Table)
                    .col(Limits::Name)
                    .col(Limits::Entity)
                    .col(Limits::EntityId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reverse order of creation
        manager
            .drop_table(Table::drop().table(Limits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RevenueAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CardTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountTypes::Table).to_owned())
            .await?;
        Ok(())
    }
}
