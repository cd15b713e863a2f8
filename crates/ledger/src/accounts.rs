//! User owned accounts.
//!
//! An account has a settled `balance` and an `available_amount`, which is the
//! balance adjusted for open holds. The currency comes from the account type.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{
    ResultEngine,
    util::{decimal_to_db, parse_decimal},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub number: String,
    pub type_id: i64,
    pub currency_code: String,
    pub user_id: String,
    pub is_active: Option<bool>,
    pub allow_withdrawals: Option<bool>,
    pub allow_deposits: Option<bool>,
    pub balance: Decimal,
    pub available_amount: Decimal,
}

impl Account {
    /// Build the domain value from a row and the currency of its type.
    pub fn from_model(model: Model, currency_code: &str) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            number: model.number,
            type_id: model.type_id,
            currency_code: currency_code.to_string(),
            user_id: model.user_id,
            is_active: model.is_active,
            allow_withdrawals: model.allow_withdrawals,
            allow_deposits: model.allow_deposits,
            balance: parse_decimal(&model.balance, "account balance")?,
            available_amount: parse_decimal(&model.available_amount, "account available amount")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub number: String,
    pub type_id: i64,
    pub user_id: String,
    pub is_active: Option<bool>,
    pub allow_withdrawals: Option<bool>,
    pub allow_deposits: Option<bool>,
    pub balance: String,
    pub available_amount: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account_types::Entity",
        from = "Column::TypeId",
        to = "super::account_types::Column::Id"
    )]
    AccountType,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::account_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountType.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        let now = Utc::now();
        Self {
            id: if account.id > 0 {
                ActiveValue::Set(account.id)
            } else {
                ActiveValue::NotSet
            },
            number: ActiveValue::Set(account.number.clone()),
            type_id: ActiveValue::Set(account.type_id),
            user_id: ActiveValue::Set(account.user_id.clone()),
            is_active: ActiveValue::Set(account.is_active),
            allow_withdrawals: ActiveValue::Set(account.allow_withdrawals),
            allow_deposits: ActiveValue::Set(account.allow_deposits),
            balance: ActiveValue::Set(decimal_to_db(account.balance)),
            available_amount: ActiveValue::Set(decimal_to_db(account.available_amount)),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}
