//! Ledger core of the accounts service.
//!
//! Requests move money between accounts, cards and revenue accounts. Each
//! request is evaluated into signed transaction legs by a transfer
//! [`subjects::Subject`], checked against static permissions and per-user
//! limits, and persisted atomically inside one database transaction.
//!
//! The [`Engine`] is the entry point: it owns the database connection and
//! runs every lifecycle operation (evaluate, dry run, pending, execute,
//! modify, cancel) inside its own transaction.

pub use currency::{Currency, CurrencyAmount, CurrencyBox, CurrencyProvider};
pub use error::EngineError;
pub use ops::{Engine, EngineBuilder, RequestChanges};

pub mod account_types;
pub mod accounts;
pub mod balance;
pub mod card_types;
pub mod cards;
pub mod details;
pub mod exchange;
pub mod limit;
pub mod limits;
pub mod permissions;
pub mod requests;
pub mod revenue_accounts;
pub mod settings;
pub mod subjects;
pub mod transactions;
pub mod transfer;

mod currency;
mod error;
mod ops;
mod store;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
