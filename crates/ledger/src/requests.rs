//! Transfer requests.
//!
//! A `Request` is a transfer intent created in status `new` and driven
//! through `pending`, `executed` or `cancelled` by its transfer subject.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde_json::{Map, Value};

use crate::{
    EngineError, ResultEngine,
    util::{decimal_to_db, parse_optional_decimal},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    New,
    Pending,
    Executed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "new" => Ok(Self::New),
            "pending" => Ok(Self::Pending),
            "executed" => Ok(Self::Executed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::UnexpectedStatus(format!(
                "invalid request status: {other}"
            ))),
        }
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the captured rate is the "from" currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RateDesignation {
    #[default]
    BaseReference,
    ReferenceBase,
}

impl RateDesignation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BaseReference => "base/reference",
            Self::ReferenceBase => "reference/base",
        }
    }
}

impl TryFrom<&str> for RateDesignation {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "base/reference" | "" => Ok(Self::BaseReference),
            "reference/base" => Ok(Self::ReferenceBase),
            other => Err(EngineError::MissingRequestData(format!(
                "invalid rate designation: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub id: i64,
    pub user_id: String,
    pub status: RequestStatus,
    /// Subject code, e.g. `TBA` or `OWT`.
    pub subject: String,
    pub base_currency_code: String,
    pub reference_currency_code: String,
    pub rate: Option<Decimal>,
    pub rate_designation: RateDesignation,
    pub amount: Option<Decimal>,
    pub input_amount: Option<Decimal>,
    pub description: Option<String>,
    pub cancellation_reason: Option<String>,
    pub input: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: Option<DateTime<Utc>>,
}

impl Request {
    pub fn new(user_id: &str, subject: &str, base: &str, reference: &str) -> Self {
        Self {
            id: 0,
            user_id: user_id.to_string(),
            status: RequestStatus::New,
            subject: subject.to_string(),
            base_currency_code: base.to_string(),
            reference_currency_code: reference.to_string(),
            rate: None,
            rate_designation: RateDesignation::BaseReference,
            amount: None,
            input_amount: None,
            description: None,
            cancellation_reason: None,
            input: Map::new(),
            created_at: Utc::now(),
            status_changed_at: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_input_amount(mut self, amount: Decimal) -> Self {
        self.input_amount = Some(amount);
        self
    }

    pub fn with_rate(mut self, rate: Decimal, designation: RateDesignation) -> Self {
        self.rate = Some(rate);
        self.rate_designation = designation;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set one key of the request input.
    pub fn with_input(mut self, key: &str, value: Value) -> Self {
        self.input.insert(key.to_string(), value);
        self
    }

    /// Currency the captured rate converts from.
    pub fn rate_base_currency_code(&self) -> &str {
        match self.rate_designation {
            RateDesignation::ReferenceBase => &self.reference_currency_code,
            RateDesignation::BaseReference => &self.base_currency_code,
        }
    }

    /// Currency the captured rate converts to.
    pub fn rate_reference_currency_code(&self) -> &str {
        match self.rate_designation {
            RateDesignation::ReferenceBase => &self.base_currency_code,
            RateDesignation::BaseReference => &self.reference_currency_code,
        }
    }

    pub fn required_amount(&self) -> ResultEngine<Decimal> {
        self.amount.ok_or_else(|| {
            EngineError::MissingRequestData(format!("request #{} has no amount", self.id))
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub status: String,
    pub subject: String,
    pub base_currency_code: String,
    pub reference_currency_code: String,
    pub rate: Option<String>,
    pub rate_designation: String,
    pub amount: Option<String>,
    pub input_amount: Option<String>,
    pub description: Option<String>,
    pub cancellation_reason: Option<String>,
    pub input: Option<String>,
    pub created_at: DateTimeUtc,
    pub status_changed_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Request> for ActiveModel {
    fn from(request: &Request) -> Self {
        Self {
            id: if request.id > 0 {
                ActiveValue::Set(request.id)
            } else {
                ActiveValue::NotSet
            },
            user_id: ActiveValue::Set(request.user_id.clone()),
            status: ActiveValue::Set(request.status.as_str().to_string()),
            subject: ActiveValue::Set(request.subject.clone()),
            base_currency_code: ActiveValue::Set(request.base_currency_code.clone()),
            reference_currency_code: ActiveValue::Set(request.reference_currency_code.clone()),
            rate: ActiveValue::Set(request.rate.map(decimal_to_db)),
            rate_designation: ActiveValue::Set(request.rate_designation.as_str().to_string()),
            amount: ActiveValue::Set(request.amount.map(decimal_to_db)),
            input_amount: ActiveValue::Set(request.input_amount.map(decimal_to_db)),
            description: ActiveValue::Set(request.description.clone()),
            cancellation_reason: ActiveValue::Set(request.cancellation_reason.clone()),
            input: ActiveValue::Set(if request.input.is_empty() {
                None
            } else {
                Some(Value::Object(request.input.clone()).to_string())
            }),
            created_at: ActiveValue::Set(request.created_at),
            status_changed_at: ActiveValue::Set(request.status_changed_at),
            updated_at: ActiveValue::Set(Utc::now()),
        }
    }
}

impl TryFrom<Model> for Request {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let input = match model.input.as_deref() {
            None | Some("") => Map::new(),
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(Value::Null) => Map::new(),
                _ => {
                    return Err(EngineError::MissingInputData(format!(
                        "request #{} input is not a JSON object",
                        model.id
                    )));
                }
            },
        };
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            status: RequestStatus::try_from(model.status.as_str())?,
            subject: model.subject,
            base_currency_code: model.base_currency_code,
            reference_currency_code: model.reference_currency_code,
            rate: parse_optional_decimal(model.rate.as_deref(), "request rate")?,
            rate_designation: RateDesignation::try_from(model.rate_designation.as_str())?,
            amount: parse_optional_decimal(model.amount.as_deref(), "request amount")?,
            input_amount: parse_optional_decimal(
                model.input_amount.as_deref(),
                "request input amount",
            )?,
            description: model.description,
            cancellation_reason: model.cancellation_reason,
            input,
            created_at: model.created_at,
            status_changed_at: model.status_changed_at,
        })
    }
}
