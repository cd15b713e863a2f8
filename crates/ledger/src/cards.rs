//! Cards funded from accounts. A card only has a settled balance.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{
    ResultEngine,
    util::{decimal_to_db, parse_decimal},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub id: i64,
    pub number: String,
    pub card_type_id: i64,
    pub currency_code: String,
    pub user_id: String,
    pub balance: Decimal,
}

impl Card {
    pub fn from_model(model: Model, currency_code: &str) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            number: model.number,
            card_type_id: model.card_type_id,
            currency_code: currency_code.to_string(),
            user_id: model.user_id,
            balance: parse_decimal(&model.balance, "card balance")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub number: String,
    pub card_type_id: i64,
    pub user_id: String,
    pub balance: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::card_types::Entity",
        from = "Column::CardTypeId",
        to = "super::card_types::Column::Id"
    )]
    CardType,
}

impl Related<super::card_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CardType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Card> for ActiveModel {
    fn from(card: &Card) -> Self {
        let now = Utc::now();
        Self {
            id: if card.id > 0 {
                ActiveValue::Set(card.id)
            } else {
                ActiveValue::NotSet
            },
            number: ActiveValue::Set(card.number.clone()),
            card_type_id: ActiveValue::Set(card.card_type_id),
            user_id: ActiveValue::Set(card.user_id.clone()),
            balance: ActiveValue::Set(decimal_to_db(card.balance)),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}
