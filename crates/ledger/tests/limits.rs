mod common;

use std::collections::{BTreeMap, HashMap};

use serde_json::{Value, json};

use common::*;
use ledger::{
    EngineError,
    balance::{AggregationItem, AggregationService},
    limit::{
        DefaultValuesStorage, Identifier, LimitError, LimitService, MAX_CREDIT_PER_TRANSFER,
        MAX_DEBIT_PER_TRANSFER, MAX_TOTAL_BALANCE, MAX_TOTAL_DEBIT_PER_DAY,
        MAX_TOTAL_DEBIT_PER_MONTH, SqlStorage, Value as LimitValue,
    },
    permissions::{LimitCheck, LimitKind},
    requests::Request,
    settings::{LedgerSettings, LimitSetting, LimitSettings},
};

/// Settings with only the named limit checked.
fn only(name: &str) -> LedgerSettings {
    let mut limits = LimitSettings::disabled();
    let setting = match name {
        MAX_TOTAL_BALANCE => &mut limits.max_total_balance,
        MAX_TOTAL_DEBIT_PER_DAY => &mut limits.max_total_debit_per_day,
        MAX_TOTAL_DEBIT_PER_MONTH => &mut limits.max_total_debit_per_month,
        _ => &mut limits.max_credit_per_transfer,
    };
    *setting = LimitSetting::default();
    LedgerSettings {
        limits,
        ..LedgerSettings::default()
    }
}

fn tba(source: i64, destination: i64, revenue: i64, amount: &str) -> Request {
    Request::new("u1", "TBA", "EUR", "EUR")
        .with_amount(dec(amount))
        .with_input("sourceAccountId", json!(source))
        .with_input("destinationAccountId", json!(destination))
        .with_input("revenueAccountId", json!(revenue))
        .with_input("exchangeMarginPercent", json!(0))
        .with_input("transferFeeParams", Value::Null)
}

#[tokio::test]
async fn limits_are_managed_by_identifier() {
    let (engine, _db) = engine_with_db().await;
    let id = Identifier::user(MAX_DEBIT_PER_TRANSFER, "u1");

    let created = engine
        .create_limit(id.clone(), LimitValue::max(dec("500"), "EUR"))
        .await
        .unwrap();
    assert_eq!(created.value, LimitValue::max(dec("500"), "EUR"));

    let duplicate = engine
        .create_limit(id.clone(), LimitValue::NoLimit)
        .await;
    assert!(matches!(
        duplicate,
        Err(EngineError::Limit(LimitError::AlreadyExist(_)))
    ));

    engine
        .update_limit(id.clone(), LimitValue::NoLimit)
        .await
        .unwrap();
    assert!(engine.find_limit(&id).await.unwrap().value.is_no_limit());

    engine
        .create_limit(
            Identifier::user(MAX_CREDIT_PER_TRANSFER, "u1"),
            LimitValue::max(dec("10"), "EUR"),
        )
        .await
        .unwrap();
    let all = engine
        .find_limits(&Identifier::new("", "user", "u1"))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    assert_eq!(engine.delete_limit(&id).await.unwrap(), 1);
    assert!(matches!(
        engine.find_limit(&id).await,
        Err(EngineError::Limit(LimitError::NotFound(_)))
    ));
}

#[tokio::test]
async fn incomplete_identifiers_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    let result = engine
        .create_limit(
            Identifier::new(MAX_DEBIT_PER_TRANSFER, "user", ""),
            LimitValue::NoLimit,
        )
        .await;

    assert!(matches!(
        result,
        Err(EngineError::Limit(LimitError::IdIncomplete(msg))) if msg.contains("EntityId")
    ));
}

#[tokio::test]
async fn credit_per_transfer_cap_blocks_the_transfer() {
    let (engine, db) = engine_with_settings(only(MAX_CREDIT_PER_TRANSFER)).await;
    let eur = account_type(&db, "EUR").await;
    let source = account(&db, eur, "u1", "5000").await;
    let destination = account(&db, eur, "u2", "0").await;
    let revenue_id = revenue(&db, "EUR", "0").await;
    engine
        .create_limit(
            Identifier::user(MAX_CREDIT_PER_TRANSFER, "u2"),
            LimitValue::max(dec("1000"), "EUR"),
        )
        .await
        .unwrap();
    let transfer = |amount: &str| tba(source, destination, revenue_id, amount);

    let within = engine.create_request(&transfer("1000")).await.unwrap();
    engine.execute_request(within.id).await.unwrap();

    let above = engine.create_request(&transfer("1001")).await.unwrap();
    let result = engine.pending_request(above.id).await;
    assert!(matches!(
        result,
        Err(EngineError::Limit(LimitError::LimitExceeded(_)))
    ));
    assert_eq!(
        account_balances(&db, source).await,
        (dec("4000"), dec("4000"))
    );
    assert!(
        engine
            .request_transactions(above.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn default_cap_applies_without_a_stored_limit() {
    let settings = LedgerSettings {
        limits: LimitSettings {
            max_debit_per_transfer: LimitSetting {
                enabled: true,
                default_amount: dec("50"),
                default_currency: "EUR".to_string(),
            },
            ..LimitSettings::disabled()
        },
        ..LedgerSettings::default()
    };
    let (engine, db) = engine_with_settings(settings).await;
    let eur = account_type(&db, "EUR").await;
    let account_id = account(&db, eur, "u1", "1000").await;
    let destination = account(&db, eur, "u2", "0").await;
    let revenue_id = revenue(&db, "EUR", "0").await;
    let request = engine
        .create_request(&tba(account_id, destination, revenue_id, "60"))
        .await
        .unwrap();

    assert!(matches!(
        engine.execute_request(request.id).await,
        Err(EngineError::Limit(LimitError::LimitExceeded(_)))
    ));

    engine
        .create_limit(
            Identifier::user(MAX_DEBIT_PER_TRANSFER, "u1"),
            LimitValue::NoLimit,
        )
        .await
        .unwrap();
    engine.execute_request(request.id).await.unwrap();
    assert_eq!(account_balances(&db, account_id).await.0, dec("940"));
}

async fn debit_cap_spans_executed_transfers(name: &str) {
    let (engine, db) = engine_with_settings(only(name)).await;
    let eur = account_type(&db, "EUR").await;
    let source = account(&db, eur, "u1", "1000").await;
    let destination = account(&db, eur, "u2", "0").await;
    let revenue_id = revenue(&db, "EUR", "0").await;
    engine
        .create_limit(
            Identifier::user(name, "u1"),
            LimitValue::max(dec("100"), "EUR"),
        )
        .await
        .unwrap();

    let first = engine
        .create_request(&tba(source, destination, revenue_id, "60"))
        .await
        .unwrap();
    engine.execute_request(first.id).await.unwrap();

    let second = engine
        .create_request(&tba(source, destination, revenue_id, "50"))
        .await
        .unwrap();
    let result = engine.execute_request(second.id).await;
    assert!(matches!(
        result,
        Err(EngineError::Limit(LimitError::LimitExceeded(msg))) if msg.contains("110 EUR")
    ));
    assert_eq!(
        account_balances(&db, source).await,
        (dec("940"), dec("940"))
    );

    let rest = engine
        .create_request(&tba(source, destination, revenue_id, "40"))
        .await
        .unwrap();
    engine.execute_request(rest.id).await.unwrap();
    assert_eq!(account_balances(&db, source).await.0, dec("900"));
}

#[tokio::test]
async fn day_cap_counts_debits_already_made_today() {
    debit_cap_spans_executed_transfers(MAX_TOTAL_DEBIT_PER_DAY).await;
}

#[tokio::test]
async fn month_cap_counts_debits_already_made_this_month() {
    debit_cap_spans_executed_transfers(MAX_TOTAL_DEBIT_PER_MONTH).await;
}

#[tokio::test]
async fn total_balance_cap_counts_pending_credits() {
    let (engine, db) = engine_with_settings(only(MAX_TOTAL_BALANCE)).await;
    let eur = account_type(&db, "EUR").await;
    let source = account(&db, eur, "u1", "1000").await;
    let destination = account(&db, eur, "u2", "900").await;
    let revenue_id = revenue(&db, "EUR", "0").await;
    engine
        .create_limit(
            Identifier::user(MAX_TOTAL_BALANCE, "u2"),
            LimitValue::max(dec("1000"), "EUR"),
        )
        .await
        .unwrap();

    let held = engine
        .create_request(&tba(source, destination, revenue_id, "50"))
        .await
        .unwrap();
    engine.pending_request(held.id).await.unwrap();
    assert_eq!(
        account_balances(&db, destination).await,
        (dec("900"), dec("900"))
    );

    let above = engine
        .create_request(&tba(source, destination, revenue_id, "60"))
        .await
        .unwrap();
    let result = engine.execute_request(above.id).await;
    assert!(matches!(
        result,
        Err(EngineError::Limit(LimitError::LimitExceeded(msg))) if msg.contains("1010 EUR")
    ));

    let within = engine
        .create_request(&tba(source, destination, revenue_id, "50"))
        .await
        .unwrap();
    engine.execute_request(within.id).await.unwrap();
    assert_eq!(account_balances(&db, destination).await.0, dec("950"));
}

#[tokio::test]
async fn credit_cap_sums_every_leg_of_the_user() {
    let db = database().await;
    let limits = LimitService::new(DefaultValuesStorage::new(SqlStorage, HashMap::new()));
    limits
        .create(
            &db,
            LimitValue::max(dec("1000"), "EUR"),
            Identifier::user(MAX_CREDIT_PER_TRANSFER, "u2"),
        )
        .await
        .unwrap();
    let aggregation = AggregationService::new(LedgerSettings::default().rate_source());
    let check = |legs: &[&str]| {
        let items = legs
            .iter()
            .map(|amount| AggregationItem::new(dec(amount), "EUR"))
            .collect();
        LimitCheck::new(
            LimitKind::MaxCreditPerTransfer,
            BTreeMap::from([("u2".to_string(), items)]),
            limits.clone(),
            aggregation.clone(),
        )
    };

    check(&["300", "500"]).check(&db).await.unwrap();
    check(&["300", "500", "200"]).check(&db).await.unwrap();
    assert!(matches!(
        check(&["300", "500", "201"]).check(&db).await,
        Err(EngineError::Limit(LimitError::LimitExceeded(msg))) if msg.contains("1001 EUR")
    ));
}
