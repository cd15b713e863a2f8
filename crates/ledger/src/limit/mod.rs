//! Spending limits.
//!
//! A [`Limit`] caps an amount for one `(name, entity, entity_id)`
//! [`Identifier`]. Its [`Value`] is either [`Value::NoLimit`] or a cap in a
//! given currency. Limits are persisted through a [`Storage`] and managed by
//! the [`LimitService`].

use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

mod service;
mod storage;

pub use service::LimitService;
pub use storage::{DefaultValuesStorage, SqlStorage, Storage};

pub const MAX_TOTAL_BALANCE: &str = "max_total_balance";
pub const MAX_DEBIT_PER_TRANSFER: &str = "max_debit_per_transfer";
pub const MAX_CREDIT_PER_TRANSFER: &str = "max_credit_per_transfer";
pub const MAX_TOTAL_DEBIT_PER_DAY: &str = "max_total_debit_per_day";
pub const MAX_TOTAL_DEBIT_PER_MONTH: &str = "max_total_debit_per_month";

/// The five limit names checked on every transfer.
pub const LIMIT_NAMES: [&str; 5] = [
    MAX_TOTAL_BALANCE,
    MAX_DEBIT_PER_TRANSFER,
    MAX_CREDIT_PER_TRANSFER,
    MAX_TOTAL_DEBIT_PER_DAY,
    MAX_TOTAL_DEBIT_PER_MONTH,
];

/// Entity the per-user limits are attached to.
pub const ENTITY_USER: &str = "user";

pub type ResultLimit<T> = Result<T, LimitError>;

#[derive(Error, Debug)]
pub enum LimitError {
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("Invalid amount given: {0}")]
    InvalidAmount(String),
    #[error("Limit is already exist: {0}")]
    AlreadyExist(String),
    #[error("One or more identifier properties are missed: {0}")]
    IdIncomplete(String),
    #[error("Limit is not found: {0}")]
    NotFound(String),
    #[error("Mismatch of currencies: {0}")]
    CurrenciesMismatch(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LimitError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::LimitExceeded(a), Self::LimitExceeded(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::AlreadyExist(a), Self::AlreadyExist(b)) => a == b,
            (Self::IdIncomplete(a), Self::IdIncomplete(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::CurrenciesMismatch(a), Self::CurrenciesMismatch(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Identity of a limit. Empty fields act as wildcards in bulk operations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub entity: String,
    pub entity_id: String,
}

impl Identifier {
    pub fn new(name: &str, entity: &str, entity_id: &str) -> Self {
        Self {
            name: name.to_string(),
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
        }
    }

    /// Identifier of a per-user limit.
    pub fn user(name: &str, user_id: &str) -> Self {
        Self::new(name, ENTITY_USER, user_id)
    }

    pub fn is_unique(&self) -> bool {
        self.missing().is_empty()
    }

    pub(crate) fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_empty() {
            missing.push("Name");
        }
        if self.entity.is_empty() {
            missing.push("Entity");
        }
        if self.entity_id.is_empty() {
            missing.push("EntityId");
        }
        missing
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "name = {}, entity = {}, entityId = {}",
            self.name, self.entity, self.entity_id
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    NoLimit,
    Max {
        amount: Decimal,
        currency_code: String,
    },
}

impl Value {
    pub fn max(amount: Decimal, currency_code: &str) -> Self {
        Self::Max {
            amount,
            currency_code: currency_code.to_string(),
        }
    }

    pub fn is_no_limit(&self) -> bool {
        matches!(self, Self::NoLimit)
    }

    /// Check `amount` against the cap.
    ///
    /// Non-positive amounts are rejected first, then a currency other than
    /// the cap's, then an amount above the cap.
    pub fn within_limit(&self, amount: Decimal, currency_code: &str) -> ResultLimit<()> {
        let Self::Max {
            amount: available,
            currency_code: limit_currency,
        } = self
        else {
            return Ok(());
        };
        if amount <= Decimal::ZERO {
            return Err(LimitError::InvalidAmount(format!(
                "expected value to be greater than 0, got {amount}"
            )));
        }
        if limit_currency != currency_code {
            return Err(LimitError::CurrenciesMismatch(format!(
                "requested amount currency {currency_code} does not match limit currency {limit_currency}"
            )));
        }
        if amount > *available {
            return Err(LimitError::LimitExceeded(format!(
                "the requested value {amount} exceeds the available limit {available}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limit {
    pub id: Identifier,
    pub value: Value,
}

impl Limit {
    pub fn new(id: Identifier, value: Value) -> Self {
        Self { id, value }
    }

    pub fn available(&self) -> &Value {
        &self.value
    }

    pub fn within_limit(&self, amount: Decimal, currency_code: &str) -> ResultLimit<()> {
        self.value.within_limit(amount, currency_code)
    }
}
