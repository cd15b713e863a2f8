#![allow(dead_code)]

use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection, EntityTrait};

use ledger::{
    Engine, account_types,
    accounts::{self, Account},
    card_types,
    cards::{self, Card},
    revenue_accounts::{self, RevenueAccount},
    settings::{LedgerSettings, LimitSettings},
};
use migration::MigratorTrait;

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

pub async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// Engine with every limit check switched off.
pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let settings = LedgerSettings {
        limits: LimitSettings::disabled(),
        ..LedgerSettings::default()
    };
    engine_with_settings(settings).await
}

pub async fn engine_with_settings(settings: LedgerSettings) -> (Engine, DatabaseConnection) {
    let db = database().await;
    let engine = Engine::builder()
        .database(db.clone())
        .settings(settings)
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn account_type(db: &DatabaseConnection, currency_code: &str) -> i64 {
    account_types::ActiveModel {
        id: ActiveValue::NotSet,
        name: ActiveValue::Set(format!("{currency_code} current")),
        currency_code: ActiveValue::Set(currency_code.to_string()),
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn account(db: &DatabaseConnection, type_id: i64, user_id: &str, balance: &str) -> i64 {
    let count = accounts::Entity::find().all(db).await.unwrap().len();
    let account = Account {
        id: 0,
        number: format!("ACC-{:04}", count + 1),
        type_id,
        currency_code: String::new(),
        user_id: user_id.to_string(),
        is_active: Some(true),
        allow_withdrawals: Some(true),
        allow_deposits: Some(true),
        balance: dec(balance),
        available_amount: dec(balance),
    };
    accounts::ActiveModel::from(&account)
        .insert(db)
        .await
        .unwrap()
        .id
}

pub async fn card(db: &DatabaseConnection, currency_code: &str, user_id: &str) -> i64 {
    let card_type_id = card_types::ActiveModel {
        id: ActiveValue::NotSet,
        name: ActiveValue::Set(format!("{currency_code} prepaid")),
        currency_code: ActiveValue::Set(currency_code.to_string()),
    }
    .insert(db)
    .await
    .unwrap()
    .id;
    let card = Card {
        id: 0,
        number: "4000000000000002".to_string(),
        card_type_id,
        currency_code: currency_code.to_string(),
        user_id: user_id.to_string(),
        balance: Decimal::ZERO,
    };
    cards::ActiveModel::from(&card).insert(db).await.unwrap().id
}

pub async fn revenue(db: &DatabaseConnection, currency_code: &str, balance: &str) -> i64 {
    let revenue = RevenueAccount {
        id: 0,
        currency_code: currency_code.to_string(),
        balance: dec(balance),
        available_amount: dec(balance),
        is_default: true,
    };
    revenue_accounts::ActiveModel::from(&revenue)
        .insert(db)
        .await
        .unwrap()
        .id
}

/// `(balance, available_amount)` as stored.
pub async fn account_balances(db: &DatabaseConnection, id: i64) -> (Decimal, Decimal) {
    let model = accounts::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    (dec(&model.balance), dec(&model.available_amount))
}

pub async fn revenue_balances(db: &DatabaseConnection, id: i64) -> (Decimal, Decimal) {
    let model = revenue_accounts::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    (dec(&model.balance), dec(&model.available_amount))
}

pub async fn card_balance(db: &DatabaseConnection, id: i64) -> Decimal {
    let model = cards::Entity::find_by_id(id).one(db).await.unwrap().unwrap();
    dec(&model.balance)
}

pub async fn set_allow_withdrawals(db: &DatabaseConnection, id: i64, allow: bool) {
    let mut model: accounts::ActiveModel = accounts::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .into();
    model.allow_withdrawals = ActiveValue::Set(Some(allow));
    model.update(db).await.unwrap();
}
