//! Internal revenue accounts collecting fees and conversion margins.

use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{
    EngineError, ResultEngine,
    util::{decimal_to_db, parse_decimal},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevenueAccount {
    pub id: i64,
    pub currency_code: String,
    pub balance: Decimal,
    pub available_amount: Decimal,
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "revenue_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub currency_code: String,
    pub balance: String,
    pub available_amount: String,
    pub is_default: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RevenueAccount> for ActiveModel {
    fn from(account: &RevenueAccount) -> Self {
        Self {
            id: if account.id > 0 {
                ActiveValue::Set(account.id)
            } else {
                ActiveValue::NotSet
            },
            currency_code: ActiveValue::Set(account.currency_code.clone()),
            balance: ActiveValue::Set(decimal_to_db(account.balance)),
            available_amount: ActiveValue::Set(decimal_to_db(account.available_amount)),
            is_default: ActiveValue::Set(account.is_default),
        }
    }
}

impl TryFrom<Model> for RevenueAccount {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            currency_code: model.currency_code,
            balance: parse_decimal(&model.balance, "revenue account balance")?,
            available_amount: parse_decimal(
                &model.available_amount,
                "revenue account available amount",
            )?,
            is_default: model.is_default,
        })
    }
}
