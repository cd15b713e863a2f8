use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Currency code together with its number of fraction digits.
///
/// Example: EUR uses 2 fraction digits (cents), JPY uses none.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub fraction: u32,
}

impl Currency {
    pub fn new(code: &str, fraction: u32) -> Self {
        Self {
            code: code.trim().to_ascii_uppercase(),
            fraction,
        }
    }

    /// Canonical currency code.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.code)
    }
}

/// An amount tagged with the currency it is expressed in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrencyAmount {
    pub currency: Currency,
    pub amount: Decimal,
}

impl CurrencyAmount {
    pub fn new(currency: Currency, amount: Decimal) -> Self {
        Self { currency, amount }
    }

    pub fn currency_code(&self) -> &str {
        self.currency.code()
    }
}

/// Resolves currency codes into [`Currency`] descriptions.
pub trait CurrencyProvider: Send + Sync {
    fn get(&self, code: &str) -> ResultEngine<Currency>;
}

/// In-memory currency registry.
#[derive(Clone, Debug, Default)]
pub struct CurrencyBox {
    currencies: HashMap<String, Currency>,
}

impl CurrencyBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a currency, replacing a previous entry with the same code.
    pub fn add(&mut self, currency: Currency) -> &mut Self {
        self.currencies.insert(currency.code.clone(), currency);
        self
    }

    pub fn with(mut self, code: &str, fraction: u32) -> Self {
        self.add(Currency::new(code, fraction));
        self
    }
}

impl CurrencyProvider for CurrencyBox {
    fn get(&self, code: &str) -> ResultEngine<Currency> {
        let key = code.trim().to_ascii_uppercase();
        self.currencies
            .get(&key)
            .cloned()
            .ok_or_else(|| EngineError::CurrencyNotFound(format!("unknown currency: {code}")))
    }
}
