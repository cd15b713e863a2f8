//! The module contains the errors the ledger can throw.
//!
//! Every variant carries a message describing what was being attempted, while
//! the variant itself stays matchable:
//!
//! - validation: [`InvalidAmount`], [`CurrenciesMismatch`], [`MissingInputData`],
//!   [`MissingRequestData`]
//! - state: [`UnexpectedStatus`], [`ModificationNotAllowed`]
//! - business rules: [`InsufficientBalance`], [`WithdrawalNotAllowed`],
//!   [`DepositNotAllowed`], [`AccountInactive`], [`Limit`]
//! - persistence: [`Database`]
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`CurrenciesMismatch`]: EngineError::CurrenciesMismatch
//!  [`MissingInputData`]: EngineError::MissingInputData
//!  [`MissingRequestData`]: EngineError::MissingRequestData
//!  [`UnexpectedStatus`]: EngineError::UnexpectedStatus
//!  [`ModificationNotAllowed`]: EngineError::ModificationNotAllowed
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`WithdrawalNotAllowed`]: EngineError::WithdrawalNotAllowed
//!  [`DepositNotAllowed`]: EngineError::DepositNotAllowed
//!  [`AccountInactive`]: EngineError::AccountInactive
//!  [`Limit`]: EngineError::Limit
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

use crate::limit::LimitError;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not enough funds: {0}")]
    NotEnoughFunds(String),
    #[error("Currencies mismatch: {0}")]
    CurrenciesMismatch(String),
    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Rate not found: {0}")]
    RateNotFound(String),
    #[error("Unexpected status: {0}")]
    UnexpectedStatus(String),
    #[error("Modification not allowed: {0}")]
    ModificationNotAllowed(String),
    #[error("Missing input data: {0}")]
    MissingInputData(String),
    #[error("Missing request data: {0}")]
    MissingRequestData(String),
    #[error("Subject not supported: {0}")]
    SubjectNotSupported(String),
    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),
    #[error("Withdrawal not allowed: {0}")]
    WithdrawalNotAllowed(String),
    #[error("Deposit not allowed: {0}")]
    DepositNotAllowed(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Account inactive: {0}")]
    AccountInactive(String),
    #[error("\"{0}\" purpose already present!")]
    DuplicatePurpose(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error(transparent)]
    Limit(#[from] LimitError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotEnoughFunds(a), Self::NotEnoughFunds(b)) => a == b,
            (Self::CurrenciesMismatch(a), Self::CurrenciesMismatch(b)) => a == b,
            (Self::CurrencyNotFound(a), Self::CurrencyNotFound(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::RateNotFound(a), Self::RateNotFound(b)) => a == b,
            (Self::UnexpectedStatus(a), Self::UnexpectedStatus(b)) => a == b,
            (Self::ModificationNotAllowed(a), Self::ModificationNotAllowed(b)) => a == b,
            (Self::MissingInputData(a), Self::MissingInputData(b)) => a == b,
            (Self::MissingRequestData(a), Self::MissingRequestData(b)) => a == b,
            (Self::SubjectNotSupported(a), Self::SubjectNotSupported(b)) => a == b,
            (Self::OperationNotSupported(a), Self::OperationNotSupported(b)) => a == b,
            (Self::WithdrawalNotAllowed(a), Self::WithdrawalNotAllowed(b)) => a == b,
            (Self::DepositNotAllowed(a), Self::DepositNotAllowed(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::AccountInactive(a), Self::AccountInactive(b)) => a == b,
            (Self::DuplicatePurpose(a), Self::DuplicatePurpose(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Limit(a), Self::Limit(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl EngineError {
    /// Tells whether the error is a business rule rejection the user may
    /// recover from by resubmitting a different request.
    pub fn is_business_rule(&self) -> bool {
        match self {
            Self::WithdrawalNotAllowed(_)
            | Self::DepositNotAllowed(_)
            | Self::InsufficientBalance(_)
            | Self::AccountInactive(_) => true,
            Self::Limit(err) => !matches!(err, LimitError::Database(_)),
            _ => false,
        }
    }
}
