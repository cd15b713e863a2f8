mod common;

use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait};
use serde_json::{Value, json};

use common::*;
use ledger::{
    EngineError, RequestChanges,
    details::Purpose,
    requests::{self, RateDesignation, Request, RequestStatus},
    transactions::TransactionStatus,
};

struct Accounts {
    source: i64,
    destination: i64,
    revenue: i64,
}

async fn eur_accounts(db: &sea_orm::DatabaseConnection) -> Accounts {
    let eur = account_type(db, "EUR").await;
    Accounts {
        source: account(db, eur, "u1", "1000").await,
        destination: account(db, eur, "u2", "0").await,
        revenue: revenue(db, "EUR", "0").await,
    }
}

fn transfer(accounts: &Accounts, amount: &str) -> Request {
    Request::new("u1", "TBA", "EUR", "EUR")
        .with_amount(dec(amount))
        .with_input("sourceAccountId", json!(accounts.source))
        .with_input("destinationAccountId", json!(accounts.destination))
        .with_input("revenueAccountId", json!(accounts.revenue))
        .with_input("exchangeMarginPercent", json!(0))
        .with_input("transferFeeParams", Value::Null)
}

#[tokio::test]
async fn execute_same_currency_transfer() {
    let (engine, db) = engine_with_db().await;
    let accounts = eur_accounts(&db).await;
    let request = engine
        .create_request(&transfer(&accounts, "100"))
        .await
        .unwrap();

    let details = engine.execute_request(request.id).await.unwrap();

    assert_eq!(details.len(), 2);
    assert_eq!(
        details.get(&Purpose::Outgoing("tba".into())).unwrap().amount,
        dec("-100")
    );
    assert_eq!(
        details.get(&Purpose::Incoming("tba".into())).unwrap().amount,
        dec("100")
    );
    let total: Decimal = details.iter().map(|d| d.amount).sum();
    assert_eq!(total, Decimal::ZERO);
    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("900"), dec("900"))
    );
    assert_eq!(
        account_balances(&db, accounts.destination).await,
        (dec("100"), dec("100"))
    );

    let request = engine.request(request.id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Executed);
    assert!(request.status_changed_at.is_some());
    let legs = engine.request_transactions(request.id).await.unwrap();
    assert_eq!(legs.len(), 2);
    assert!(
        legs.iter()
            .all(|leg| leg.status == Some(TransactionStatus::Executed))
    );
}

#[tokio::test]
async fn execute_cross_currency_transfer_with_margin_and_fee() {
    let (engine, db) = engine_with_db().await;
    let eur = account_type(&db, "EUR").await;
    let usd = account_type(&db, "USD").await;
    let accounts = Accounts {
        source: account(&db, eur, "u1", "1000").await,
        destination: account(&db, usd, "u2", "0").await,
        revenue: revenue(&db, "EUR", "0").await,
    };
    let request = Request::new("u1", "TBA", "EUR", "USD")
        .with_amount(dec("100"))
        .with_rate(dec("1.10"), RateDesignation::BaseReference)
        .with_input("sourceAccountId", json!(accounts.source))
        .with_input("destinationAccountId", json!(accounts.destination))
        .with_input("revenueAccountId", json!(accounts.revenue))
        .with_input("exchangeMarginPercent", json!(10))
        .with_input("transferFeeParams", json!({"base": 10, "percent": 25}));
    let request = engine.create_request(&request).await.unwrap();

    let details = engine.execute_request(request.id).await.unwrap();

    assert_eq!(details.len(), 6);
    assert_eq!(
        details
            .get(&Purpose::Outgoing("tba".into()))
            .unwrap()
            .transaction
            .show_amount,
        Some(dec("-100"))
    );
    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("865"), dec("865"))
    );
    assert_eq!(
        revenue_balances(&db, accounts.revenue).await,
        (dec("45"), dec("45"))
    );
    assert_eq!(account_balances(&db, accounts.destination).await.0, dec("99"));
}

#[tokio::test]
async fn evaluate_and_dry_run_store_nothing() {
    let (engine, db) = engine_with_db().await;
    let accounts = eur_accounts(&db).await;
    let request = engine
        .create_request(&transfer(&accounts, "100"))
        .await
        .unwrap();

    let evaluated = engine.evaluate_request(request.id).await.unwrap();
    let dry = engine.dry_run_request(request.id).await.unwrap();

    assert_eq!(evaluated.len(), 2);
    assert_eq!(dry.len(), 2);
    let outgoing = dry.get(&Purpose::Outgoing("tba".into())).unwrap();
    assert_eq!(
        outgoing.transaction.available_balance_snapshot,
        Some(dec("1000"))
    );
    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("1000"), dec("1000"))
    );
    assert!(
        engine
            .request_transactions(request.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        engine.request(request.id).await.unwrap().status,
        RequestStatus::New
    );
}

#[tokio::test]
async fn pending_then_cancel_restores_available_amount() {
    let (engine, db) = engine_with_db().await;
    let accounts = eur_accounts(&db).await;
    let request = engine
        .create_request(&transfer(&accounts, "100"))
        .await
        .unwrap();

    engine.pending_request(request.id).await.unwrap();
    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("1000"), dec("900"))
    );
    assert_eq!(
        account_balances(&db, accounts.destination).await,
        (Decimal::ZERO, Decimal::ZERO)
    );

    engine
        .cancel_request(request.id, "customer changed their mind")
        .await
        .unwrap();

    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("1000"), dec("1000"))
    );
    let request = engine.request(request.id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Cancelled);
    assert_eq!(
        request.cancellation_reason.as_deref(),
        Some("customer changed their mind")
    );
    let legs = engine.request_transactions(request.id).await.unwrap();
    assert!(
        legs.iter()
            .all(|leg| leg.status == Some(TransactionStatus::Cancelled))
    );
}

#[tokio::test]
async fn pending_then_execute_matches_direct_execution() {
    let (engine, db) = engine_with_db().await;
    let held = eur_accounts(&db).await;
    let direct = eur_accounts(&db).await;

    let two_phase = engine
        .create_request(&transfer(&held, "100"))
        .await
        .unwrap();
    engine.pending_request(two_phase.id).await.unwrap();
    let pending_ids: Vec<i64> = engine
        .request_transactions(two_phase.id)
        .await
        .unwrap()
        .iter()
        .map(|leg| leg.id)
        .collect();
    engine.execute_request(two_phase.id).await.unwrap();

    let one_phase = engine
        .create_request(&transfer(&direct, "100"))
        .await
        .unwrap();
    engine.execute_request(one_phase.id).await.unwrap();

    assert_eq!(
        account_balances(&db, held.source).await,
        account_balances(&db, direct.source).await
    );
    assert_eq!(
        account_balances(&db, held.destination).await,
        account_balances(&db, direct.destination).await
    );
    assert_eq!(
        account_balances(&db, held.source).await,
        (dec("900"), dec("900"))
    );

    let legs = engine.request_transactions(two_phase.id).await.unwrap();
    let executed_ids: Vec<i64> = legs.iter().map(|leg| leg.id).collect();
    assert_eq!(pending_ids, executed_ids);
    assert!(
        legs.iter()
            .all(|leg| leg.status == Some(TransactionStatus::Executed))
    );
}

#[tokio::test]
async fn modify_recomputes_pending_legs_in_place() {
    let (engine, db) = engine_with_db().await;
    let accounts = eur_accounts(&db).await;
    let request = engine
        .create_request(&transfer(&accounts, "100"))
        .await
        .unwrap();
    engine.pending_request(request.id).await.unwrap();
    let before = engine.request_transactions(request.id).await.unwrap();

    let details = engine
        .modify_request(
            request.id,
            RequestChanges {
                amount: Some(dec("150")),
                ..RequestChanges::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        details.get(&Purpose::Outgoing("tba".into())).unwrap().amount,
        dec("-150")
    );
    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("1000"), dec("850"))
    );
    let after = engine.request_transactions(request.id).await.unwrap();
    assert_eq!(
        before.iter().map(|leg| leg.id).collect::<Vec<_>>(),
        after.iter().map(|leg| leg.id).collect::<Vec<_>>()
    );
    assert!(after.iter().any(|leg| leg.amount == dec("-150")));
    assert_eq!(
        engine.request(request.id).await.unwrap().amount,
        Some(dec("150"))
    );

    engine.execute_request(request.id).await.unwrap();
    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("850"), dec("850"))
    );
    assert_eq!(
        account_balances(&db, accounts.destination).await,
        (dec("150"), dec("150"))
    );
}

#[tokio::test]
async fn modify_requires_changes_and_a_pending_request() {
    let (engine, db) = engine_with_db().await;
    let accounts = eur_accounts(&db).await;
    let request = engine
        .create_request(&transfer(&accounts, "100"))
        .await
        .unwrap();

    let empty = engine
        .modify_request(request.id, RequestChanges::default())
        .await;
    assert!(matches!(empty, Err(EngineError::ModificationNotAllowed(_))));

    let not_pending = engine
        .modify_request(
            request.id,
            RequestChanges {
                amount: Some(dec("10")),
                ..RequestChanges::default()
            },
        )
        .await;
    assert!(matches!(not_pending, Err(EngineError::UnexpectedStatus(_))));

    engine.execute_request(request.id).await.unwrap();
    assert!(matches!(
        engine.cancel_request(request.id, "late").await,
        Err(EngineError::UnexpectedStatus(_))
    ));
    assert!(matches!(
        engine.execute_request(request.id).await,
        Err(EngineError::UnexpectedStatus(_))
    ));
}

#[tokio::test]
async fn modify_rejects_a_different_number_of_legs() {
    let (engine, db) = engine_with_db().await;
    let accounts = eur_accounts(&db).await;
    let request = engine
        .create_request(&transfer(&accounts, "100"))
        .await
        .unwrap();
    engine.pending_request(request.id).await.unwrap();

    let mut stored: requests::ActiveModel = requests::Entity::find_by_id(request.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap()
        .into();
    let mut input = request.input.clone();
    input.insert("transferFeeParams".into(), json!({"base": 5}));
    stored.input = ActiveValue::Set(Some(Value::Object(input).to_string()));
    stored.update(&db).await.unwrap();

    let result = engine
        .modify_request(
            request.id,
            RequestChanges {
                amount: Some(dec("120")),
                ..RequestChanges::default()
            },
        )
        .await;

    assert!(matches!(result, Err(EngineError::ModificationNotAllowed(_))));
    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("1000"), dec("900"))
    );
    assert_eq!(
        engine.request(request.id).await.unwrap().amount,
        Some(dec("100"))
    );
}

#[tokio::test]
async fn outgoing_wire_derives_and_updates_the_amount() {
    let (engine, db) = engine_with_db().await;
    let eur = account_type(&db, "EUR").await;
    let source = account(&db, eur, "u1", "1000").await;
    let revenue_id = revenue(&db, "EUR", "0").await;
    let request = Request::new("u1", "OWT", "EUR", "USD")
        .with_input_amount(dec("125"))
        .with_rate(dec("1.25"), RateDesignation::BaseReference)
        .with_input("sourceAccountId", json!(source))
        .with_input("revenueAccountId", json!(revenue_id))
        .with_input("exchangeMarginPercent", json!(0))
        .with_input("transferFeeParams", json!({"base": 0}))
        .with_input("beneficiaryCustomerAccountName", json!("ACME Ltd"))
        .with_input("refMessage", json!("invoice 42"));
    let request = engine.create_request(&request).await.unwrap();

    engine.pending_request(request.id).await.unwrap();
    assert_eq!(
        engine.request(request.id).await.unwrap().amount,
        Some(dec("100"))
    );
    assert_eq!(
        account_balances(&db, source).await,
        (dec("1000"), dec("900"))
    );

    engine
        .modify_request(
            request.id,
            RequestChanges {
                input_amount: Some(dec("250")),
                ..RequestChanges::default()
            },
        )
        .await
        .unwrap();
    let modified = engine.request(request.id).await.unwrap();
    assert_eq!(modified.amount, Some(dec("200")));
    assert_eq!(modified.input_amount, Some(dec("250")));
    assert_eq!(
        account_balances(&db, source).await,
        (dec("1000"), dec("800"))
    );

    engine.execute_request(request.id).await.unwrap();
    assert_eq!(
        account_balances(&db, source).await,
        (dec("800"), dec("800"))
    );
}

#[tokio::test]
async fn card_funding_credits_the_card() {
    let (engine, db) = engine_with_db().await;
    let eur = account_type(&db, "EUR").await;
    let source = account(&db, eur, "u1", "1000").await;
    let card_id = card(&db, "EUR", "u1").await;
    let revenue_id = revenue(&db, "EUR", "0").await;
    let request = Request::new("u1", "CFT", "EUR", "EUR")
        .with_amount(dec("50"))
        .with_input("sourceAccountId", json!(source))
        .with_input("destinationCardId", json!(card_id))
        .with_input("revenueAccountId", json!(revenue_id))
        .with_input("exchangeMarginPercent", Value::Null)
        .with_input("transferFeeParams", json!({"base": 2}));
    let request = engine.create_request(&request).await.unwrap();

    engine.pending_request(request.id).await.unwrap();
    assert_eq!(card_balance(&db, card_id).await, Decimal::ZERO);

    engine.execute_request(request.id).await.unwrap();
    assert_eq!(card_balance(&db, card_id).await, dec("50"));
    assert_eq!(
        account_balances(&db, source).await,
        (dec("948"), dec("948"))
    );
    assert_eq!(revenue_balances(&db, revenue_id).await.0, dec("2"));
}

#[tokio::test]
async fn single_phase_subjects_execute_from_new_only() {
    let (engine, db) = engine_with_db().await;
    let eur = account_type(&db, "EUR").await;
    let account_id = account(&db, eur, "u1", "0").await;
    let request = Request::new("u1", "CA", "EUR", "EUR")
        .with_amount(dec("200"))
        .with_input("accountId", json!(account_id));
    let request = engine.create_request(&request).await.unwrap();

    assert!(matches!(
        engine.pending_request(request.id).await,
        Err(EngineError::OperationNotSupported(_))
    ));
    assert!(matches!(
        engine.cancel_request(request.id, "no").await,
        Err(EngineError::OperationNotSupported(_))
    ));

    engine.execute_request(request.id).await.unwrap();
    assert_eq!(
        account_balances(&db, account_id).await,
        (dec("200"), dec("200"))
    );
    assert!(matches!(
        engine.execute_request(request.id).await,
        Err(EngineError::UnexpectedStatus(_))
    ));
}

#[tokio::test]
async fn debit_account_checks_withdrawals_and_balance() {
    let (engine, db) = engine_with_db().await;
    let eur = account_type(&db, "EUR").await;
    let account_id = account(&db, eur, "u1", "100").await;
    let debit = |amount: &str| {
        Request::new("u1", "DA", "EUR", "EUR")
            .with_amount(dec(amount))
            .with_input("accountId", json!(account_id))
    };

    let too_much = engine.create_request(&debit("150")).await.unwrap();
    assert!(matches!(
        engine.execute_request(too_much.id).await,
        Err(EngineError::InsufficientBalance(_))
    ));

    set_allow_withdrawals(&db, account_id, false).await;
    let blocked = engine.create_request(&debit("10")).await.unwrap();
    assert!(matches!(
        engine.execute_request(blocked.id).await,
        Err(EngineError::WithdrawalNotAllowed(_))
    ));
    assert_eq!(
        account_balances(&db, account_id).await,
        (dec("100"), dec("100"))
    );
}

#[tokio::test]
async fn debit_account_may_go_negative_when_allowed() {
    let (engine, db) = engine_with_db().await;
    let eur = account_type(&db, "EUR").await;
    let account_id = account(&db, eur, "u1", "100").await;
    let revenue_id = revenue(&db, "EUR", "0").await;
    let request = Request::new("u1", "DA", "EUR", "EUR")
        .with_amount(dec("150"))
        .with_input("accountId", json!(account_id))
        .with_input("allowNegativeBalance", json!(true))
        .with_input("creditToRevenueAccount", json!(true))
        .with_input("revenueAccountId", json!(revenue_id));
    let request = engine.create_request(&request).await.unwrap();

    engine.execute_request(request.id).await.unwrap();

    assert_eq!(
        account_balances(&db, account_id).await,
        (dec("-50"), dec("-50"))
    );
    assert_eq!(revenue_balances(&db, revenue_id).await.0, dec("150"));
}

#[tokio::test]
async fn debit_revenue_account() {
    let (engine, db) = engine_with_db().await;
    let revenue_id = revenue(&db, "EUR", "500").await;
    let request = Request::new("u1", "DRA", "EUR", "EUR")
        .with_amount(dec("120"))
        .with_input("revenueAccountId", json!(revenue_id));
    let request = engine.create_request(&request).await.unwrap();

    let details = engine.execute_request(request.id).await.unwrap();

    assert_eq!(details.len(), 1);
    assert_eq!(
        details.get(&Purpose::DebitRevenue).unwrap().amount,
        dec("-120")
    );
    assert_eq!(
        revenue_balances(&db, revenue_id).await,
        (dec("380"), dec("380"))
    );
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let (engine, db) = engine_with_db().await;
    let accounts = eur_accounts(&db).await;

    assert!(matches!(
        engine.create_request(&transfer(&accounts, "0")).await,
        Err(EngineError::InvalidAmount(_))
    ));

    let unknown = Request::new("u1", "XYZ", "EUR", "EUR").with_amount(dec("1"));
    let unknown = engine.create_request(&unknown).await.unwrap();
    assert!(matches!(
        engine.execute_request(unknown.id).await,
        Err(EngineError::SubjectNotSupported(_))
    ));

    let missing = Request::new("u1", "TBA", "EUR", "EUR").with_amount(dec("1"));
    let missing = engine.create_request(&missing).await.unwrap();
    assert!(matches!(
        engine.execute_request(missing.id).await,
        Err(EngineError::MissingInputData(_))
    ));

    assert!(matches!(
        engine.request(999).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn transfer_to_the_same_account_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let mut accounts = eur_accounts(&db).await;
    accounts.destination = accounts.source;
    let request = engine
        .create_request(&transfer(&accounts, "100"))
        .await
        .unwrap();

    assert!(matches!(
        engine.pending_request(request.id).await,
        Err(EngineError::OperationNotSupported(_))
    ));
    assert!(matches!(
        engine.execute_request(request.id).await,
        Err(EngineError::OperationNotSupported(_))
    ));

    assert_eq!(
        account_balances(&db, accounts.source).await,
        (dec("1000"), dec("1000"))
    );
    assert!(
        engine
            .request_transactions(request.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        engine.request(request.id).await.unwrap().status,
        RequestStatus::New
    );
}
