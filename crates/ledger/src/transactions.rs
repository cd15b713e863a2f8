//! Persisted ledger legs.
//!
//! Each leg belongs to one request and exactly one owner. A negative amount
//! is a debit, a positive one a credit. Legs only change status or, while
//! pending, get their amounts and snapshots rewritten.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{
    EngineError, ResultEngine,
    details::Purpose,
    util::{decimal_to_db, parse_decimal, parse_optional_decimal},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Executed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "executed" => Ok(Self::Executed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::UnexpectedStatus(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionType {
    Account,
    Card,
    Fee,
    Revenue,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Card => "card",
            Self::Fee => "fee",
            Self::Revenue => "revenue",
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "account" => Ok(Self::Account),
            "card" => Ok(Self::Card),
            "fee" => Ok(Self::Fee),
            "revenue" => Ok(Self::Revenue),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

/// The single owner a leg is booked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegOwner {
    Account(i64),
    Card(i64),
    RevenueAccount(i64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    /// Zero until the leg is persisted.
    pub id: i64,
    pub request_id: i64,
    pub owner: LegOwner,
    pub status: Option<TransactionStatus>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub show_amount: Option<Decimal>,
    pub available_balance_snapshot: Option<Decimal>,
    pub show_available_balance_snapshot: Option<Decimal>,
    pub current_balance_snapshot: Option<Decimal>,
    pub show_current_balance_snapshot: Option<Decimal>,
    pub is_visible: bool,
    pub kind: TransactionType,
    pub purpose: Purpose,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub request_id: i64,
    pub account_id: Option<i64>,
    pub card_id: Option<i64>,
    pub revenue_account_id: Option<i64>,
    pub status: String,
    pub description: Option<String>,
    pub amount: String,
    pub show_amount: Option<String>,
    pub available_balance_snapshot: Option<String>,
    pub show_available_balance_snapshot: Option<String>,
    pub current_balance_snapshot: Option<String>,
    pub show_current_balance_snapshot: Option<String>,
    pub is_visible: bool,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub purpose: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requests::Entity",
        from = "Column::RequestId",
        to = "super::requests::Column::Id"
    )]
    Request,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Account,
}

impl Related<super::requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        let (account_id, card_id, revenue_account_id) = match tx.owner {
            LegOwner::Account(id) => (Some(id), None, None),
            LegOwner::Card(id) => (None, Some(id), None),
            LegOwner::RevenueAccount(id) => (None, None, Some(id)),
        };
        Self {
            id: if tx.id > 0 {
                ActiveValue::Set(tx.id)
            } else {
                ActiveValue::NotSet
            },
            request_id: ActiveValue::Set(tx.request_id),
            account_id: ActiveValue::Set(account_id),
            card_id: ActiveValue::Set(card_id),
            revenue_account_id: ActiveValue::Set(revenue_account_id),
            status: ActiveValue::Set(
                tx.status
                    .unwrap_or(TransactionStatus::Pending)
                    .as_str()
                    .to_string(),
            ),
            description: ActiveValue::Set(tx.description.clone()),
            amount: ActiveValue::Set(decimal_to_db(tx.amount)),
            show_amount: ActiveValue::Set(tx.show_amount.map(decimal_to_db)),
            available_balance_snapshot: ActiveValue::Set(
                tx.available_balance_snapshot.map(decimal_to_db),
            ),
            show_available_balance_snapshot: ActiveValue::Set(
                tx.show_available_balance_snapshot.map(decimal_to_db),
            ),
            current_balance_snapshot: ActiveValue::Set(
                tx.current_balance_snapshot.map(decimal_to_db),
            ),
            show_current_balance_snapshot: ActiveValue::Set(
                tx.show_current_balance_snapshot.map(decimal_to_db),
            ),
            is_visible: ActiveValue::Set(tx.is_visible),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            purpose: ActiveValue::Set(tx.purpose.to_string()),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(Utc::now()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let owner = match (model.account_id, model.card_id, model.revenue_account_id) {
            (Some(id), None, None) => LegOwner::Account(id),
            (None, Some(id), None) => LegOwner::Card(id),
            (None, None, Some(id)) => LegOwner::RevenueAccount(id),
            _ => {
                return Err(EngineError::KeyNotFound(format!(
                    "transaction #{} must belong to exactly one owner",
                    model.id
                )));
            }
        };
        Ok(Self {
            id: model.id,
            request_id: model.request_id,
            owner,
            status: Some(TransactionStatus::try_from(model.status.as_str())?),
            description: model.description,
            amount: parse_decimal(&model.amount, "transaction amount")?,
            show_amount: parse_optional_decimal(model.show_amount.as_deref(), "show amount")?,
            available_balance_snapshot: parse_optional_decimal(
                model.available_balance_snapshot.as_deref(),
                "available balance snapshot",
            )?,
            show_available_balance_snapshot: parse_optional_decimal(
                model.show_available_balance_snapshot.as_deref(),
                "show available balance snapshot",
            )?,
            current_balance_snapshot: parse_optional_decimal(
                model.current_balance_snapshot.as_deref(),
                "current balance snapshot",
            )?,
            show_current_balance_snapshot: parse_optional_decimal(
                model.show_current_balance_snapshot.as_deref(),
                "show current balance snapshot",
            )?,
            is_visible: model.is_visible,
            kind: TransactionType::try_from(model.kind.as_str())?,
            purpose: model.purpose.parse()?,
            created_at: model.created_at,
        })
    }
}
