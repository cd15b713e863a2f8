//! Row-locked loaders and atomic updaters used by the transfer subjects.
//!
//! Every function runs on the caller's connection, normally the open
//! database transaction of one lifecycle operation. Loaders take an
//! exclusive row lock so concurrent operations on the same owner serialize.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

use crate::{
    EngineError, ResultEngine, account_types,
    accounts::{self, Account},
    card_types,
    cards::{self, Card},
    details::{Details, Owner},
    requests::{self, Request, RequestStatus},
    revenue_accounts::{self, RevenueAccount},
    transactions::{self, Transaction, TransactionStatus},
    util::decimal_to_db,
};

pub(crate) async fn lock_request<C: ConnectionTrait>(db: &C, id: i64) -> ResultEngine<Request> {
    let model = requests::Entity::find_by_id(id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("request #{id} not exists")))?;
    Request::try_from(model)
}

pub(crate) async fn lock_account<C: ConnectionTrait>(db: &C, id: i64) -> ResultEngine<Account> {
    let (model, account_type) = accounts::Entity::find_by_id(id)
        .find_also_related(account_types::Entity)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("account #{id} not exists")))?;
    let account_type = account_type.ok_or_else(|| {
        EngineError::KeyNotFound(format!("account #{id} has no account type"))
    })?;
    Account::from_model(model, &account_type.currency_code)
}

pub(crate) async fn lock_card<C: ConnectionTrait>(db: &C, id: i64) -> ResultEngine<Card> {
    let (model, card_type) = cards::Entity::find_by_id(id)
        .find_also_related(card_types::Entity)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("card #{id} not exists")))?;
    let card_type = card_type
        .ok_or_else(|| EngineError::KeyNotFound(format!("card #{id} has no card type")))?;
    Card::from_model(model, &card_type.currency_code)
}

pub(crate) async fn lock_revenue_account<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> ResultEngine<RevenueAccount> {
    let model = revenue_accounts::Entity::find_by_id(id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("revenue account #{id} not exists")))?;
    RevenueAccount::try_from(model)
}

/// Legs of a request in the order they were created.
pub(crate) async fn load_transactions<C: ConnectionTrait>(
    db: &C,
    request_id: i64,
) -> ResultEngine<Vec<Transaction>> {
    transactions::Entity::find()
        .filter(transactions::Column::RequestId.eq(request_id))
        .order_by_asc(transactions::Column::Id)
        .lock_exclusive()
        .all(db)
        .await?
        .into_iter()
        .map(Transaction::try_from)
        .collect()
}

/// Persist the balances of an owner.
pub(crate) async fn update_owner<C: ConnectionTrait>(db: &C, owner: &Owner) -> ResultEngine<()> {
    let now = Utc::now();
    match owner {
        Owner::Account(account) => {
            accounts::Entity::update_many()
                .col_expr(accounts::Column::Balance, Expr::value(decimal_to_db(account.balance)))
                .col_expr(
                    accounts::Column::AvailableAmount,
                    Expr::value(decimal_to_db(account.available_amount)),
                )
                .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
                .filter(accounts::Column::Id.eq(account.id))
                .exec(db)
                .await?;
        }
        Owner::Card(card) => {
            cards::Entity::update_many()
                .col_expr(cards::Column::Balance, Expr::value(decimal_to_db(card.balance)))
                .col_expr(cards::Column::UpdatedAt, Expr::value(now))
                .filter(cards::Column::Id.eq(card.id))
                .exec(db)
                .await?;
        }
        Owner::RevenueAccount(account) => {
            revenue_accounts::Entity::update_many()
                .col_expr(
                    revenue_accounts::Column::Balance,
                    Expr::value(decimal_to_db(account.balance)),
                )
                .col_expr(
                    revenue_accounts::Column::AvailableAmount,
                    Expr::value(decimal_to_db(account.available_amount)),
                )
                .filter(revenue_accounts::Column::Id.eq(account.id))
                .exec(db)
                .await?;
        }
    }
    Ok(())
}

pub(crate) async fn update_owners<C: ConnectionTrait>(db: &C, owners: &[Owner]) -> ResultEngine<()> {
    for owner in owners {
        update_owner(db, owner).await?;
    }
    Ok(())
}

/// Set the request status. Nothing is written when it already has it.
pub(crate) async fn update_request_status<C: ConnectionTrait>(
    db: &C,
    request: &mut Request,
    status: RequestStatus,
) -> ResultEngine<()> {
    if request.status == status {
        return Ok(());
    }
    let now = Utc::now();
    requests::Entity::update_many()
        .col_expr(requests::Column::Status, Expr::value(status.as_str()))
        .col_expr(requests::Column::StatusChangedAt, Expr::value(now))
        .col_expr(requests::Column::UpdatedAt, Expr::value(now))
        .filter(requests::Column::Id.eq(request.id))
        .exec(db)
        .await?;
    request.status = status;
    request.status_changed_at = Some(now);
    Ok(())
}

pub(crate) async fn update_request_status_and_amount<C: ConnectionTrait>(
    db: &C,
    request: &mut Request,
    status: RequestStatus,
) -> ResultEngine<()> {
    if request.status == status {
        return Ok(());
    }
    let now = Utc::now();
    requests::Entity::update_many()
        .col_expr(requests::Column::Status, Expr::value(status.as_str()))
        .col_expr(
            requests::Column::Amount,
            Expr::value(request.amount.map(decimal_to_db)),
        )
        .col_expr(requests::Column::StatusChangedAt, Expr::value(now))
        .col_expr(requests::Column::UpdatedAt, Expr::value(now))
        .filter(requests::Column::Id.eq(request.id))
        .exec(db)
        .await?;
    request.status = status;
    request.status_changed_at = Some(now);
    Ok(())
}

pub(crate) async fn update_request_status_and_reason<C: ConnectionTrait>(
    db: &C,
    request: &mut Request,
    status: RequestStatus,
    reason: &str,
) -> ResultEngine<()> {
    if request.status == status {
        return Ok(());
    }
    let now = Utc::now();
    requests::Entity::update_many()
        .col_expr(requests::Column::Status, Expr::value(status.as_str()))
        .col_expr(requests::Column::CancellationReason, Expr::value(reason))
        .col_expr(requests::Column::StatusChangedAt, Expr::value(now))
        .col_expr(requests::Column::UpdatedAt, Expr::value(now))
        .filter(requests::Column::Id.eq(request.id))
        .exec(db)
        .await?;
    request.status = status;
    request.cancellation_reason = Some(reason.to_string());
    request.status_changed_at = Some(now);
    Ok(())
}

pub(crate) async fn update_request_amount_and_rate<C: ConnectionTrait>(
    db: &C,
    request: &Request,
) -> ResultEngine<()> {
    requests::Entity::update_many()
        .col_expr(
            requests::Column::Amount,
            Expr::value(request.amount.map(decimal_to_db)),
        )
        .col_expr(requests::Column::Rate, Expr::value(request.rate.map(decimal_to_db)))
        .col_expr(
            requests::Column::InputAmount,
            Expr::value(request.input_amount.map(decimal_to_db)),
        )
        .col_expr(requests::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(requests::Column::Id.eq(request.id))
        .exec(db)
        .await?;
    Ok(())
}

pub(crate) async fn update_transactions_status<C: ConnectionTrait>(
    db: &C,
    request_id: i64,
    status: TransactionStatus,
) -> ResultEngine<()> {
    transactions::Entity::update_many()
        .col_expr(transactions::Column::Status, Expr::value(status.as_str()))
        .col_expr(transactions::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(transactions::Column::RequestId.eq(request_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Insert the legs of freshly evaluated details with the given status.
pub(crate) async fn save_transactions<C: ConnectionTrait>(
    db: &C,
    details: &mut Details,
    status: TransactionStatus,
) -> ResultEngine<()> {
    for detail in details.iter_mut() {
        detail.transaction.status = Some(status);
        let model = transactions::ActiveModel::from(&detail.transaction)
            .insert(db)
            .await?;
        detail.transaction.id = model.id;
    }
    Ok(())
}

/// Rewrite existing legs from recomputed details, matching them by purpose.
pub(crate) async fn sync_transactions<C: ConnectionTrait>(
    db: &C,
    details: &mut Details,
    existing: &[Transaction],
    status: TransactionStatus,
) -> ResultEngine<()> {
    let now = Utc::now();
    for tx in existing {
        let Some(detail) = details.iter_mut().find(|d| d.purpose == tx.purpose) else {
            tracing::warn!(request_id = tx.request_id, purpose = %tx.purpose, "leg purpose vanished on recompute");
            return Err(EngineError::ModificationNotAllowed(format!(
                "transaction purpose \"{}\" is not found, changes may only affect existing transactions",
                tx.purpose
            )));
        };
        let fresh = &mut detail.transaction;
        transactions::Entity::update_many()
            .col_expr(transactions::Column::Amount, Expr::value(decimal_to_db(fresh.amount)))
            .col_expr(
                transactions::Column::ShowAmount,
                Expr::value(fresh.show_amount.map(decimal_to_db)),
            )
            .col_expr(
                transactions::Column::AvailableBalanceSnapshot,
                Expr::value(fresh.available_balance_snapshot.map(decimal_to_db)),
            )
            .col_expr(
                transactions::Column::CurrentBalanceSnapshot,
                Expr::value(fresh.current_balance_snapshot.map(decimal_to_db)),
            )
            .col_expr(transactions::Column::Status, Expr::value(status.as_str()))
            .col_expr(transactions::Column::UpdatedAt, Expr::value(now))
            .filter(transactions::Column::Id.eq(tx.id))
            .exec(db)
            .await?;
        fresh.id = tx.id;
        fresh.status = Some(status);
        fresh.created_at = tx.created_at;
    }
    Ok(())
}

/// Give back the holds placed by the given legs to their owners.
pub(crate) fn release_holds(owners: &mut [Owner], legs: &[Transaction]) {
    for leg in legs.iter().filter(|leg| leg.amount < Decimal::ZERO) {
        if let Some(owner) = owners.iter_mut().find(|o| o.leg_owner() == leg.owner) {
            owner.release(leg.amount.abs());
        }
    }
}
