//! Ledger settings.
//!
//! Every type deserializes with `serde` and falls back to its default for
//! missing fields, so the binary can layer a partial file and environment
//! variables on top of the built-in values.

use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    CurrencyBox,
    exchange::{CachedRateSource, DirectRateSource, PivotRateSource, Rate, RateSource, ReverseRateSource},
    limit::{
        LIMIT_NAMES, MAX_CREDIT_PER_TRANSFER, MAX_DEBIT_PER_TRANSFER, MAX_TOTAL_BALANCE,
        MAX_TOTAL_DEBIT_PER_DAY, MAX_TOTAL_DEBIT_PER_MONTH, Value,
    },
};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitSetting {
    pub enabled: bool,
    /// Cap used when no limit is stored for a user.
    pub default_amount: Decimal,
    pub default_currency: String,
}

impl Default for LimitSetting {
    fn default() -> Self {
        Self {
            enabled: true,
            default_amount: Decimal::ZERO,
            default_currency: "EUR".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitSettings {
    pub max_total_balance: LimitSetting,
    pub max_debit_per_transfer: LimitSetting,
    pub max_credit_per_transfer: LimitSetting,
    pub max_total_debit_per_day: LimitSetting,
    pub max_total_debit_per_month: LimitSetting,
}

impl LimitSettings {
    /// Every limit check switched off.
    pub fn disabled() -> Self {
        let off = LimitSetting {
            enabled: false,
            ..LimitSetting::default()
        };
        Self {
            max_total_balance: off.clone(),
            max_debit_per_transfer: off.clone(),
            max_credit_per_transfer: off.clone(),
            max_total_debit_per_day: off.clone(),
            max_total_debit_per_month: off,
        }
    }

    pub fn get(&self, name: &str) -> Option<&LimitSetting> {
        match name {
            MAX_TOTAL_BALANCE => Some(&self.max_total_balance),
            MAX_DEBIT_PER_TRANSFER => Some(&self.max_debit_per_transfer),
            MAX_CREDIT_PER_TRANSFER => Some(&self.max_credit_per_transfer),
            MAX_TOTAL_DEBIT_PER_DAY => Some(&self.max_total_debit_per_day),
            MAX_TOTAL_DEBIT_PER_MONTH => Some(&self.max_total_debit_per_month),
            _ => None,
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|setting| setting.enabled)
    }

    /// Values synthesized for users without a stored limit.
    pub fn defaults(&self) -> HashMap<String, Value> {
        LIMIT_NAMES
            .iter()
            .filter_map(|name| {
                self.get(name).map(|setting| {
                    (
                        (*name).to_string(),
                        Value::max(setting.default_amount, &setting.default_currency),
                    )
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CurrencySetting {
    pub code: String,
    pub fraction: u32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RateSetting {
    pub base: String,
    pub reference: String,
    pub rate: Decimal,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerSettings {
    pub limits: LimitSettings,
    pub currencies: Vec<CurrencySetting>,
    /// Currency every configured rate is expressed against.
    pub pivot_currency: String,
    pub rates: Vec<RateSetting>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            limits: LimitSettings::default(),
            currencies: ["EUR", "USD", "GBP"]
                .into_iter()
                .map(|code| CurrencySetting {
                    code: code.to_string(),
                    fraction: 2,
                })
                .collect(),
            pivot_currency: "EUR".to_string(),
            rates: Vec::new(),
        }
    }
}

impl LedgerSettings {
    pub fn currency_box(&self) -> CurrencyBox {
        self.currencies
            .iter()
            .fold(CurrencyBox::new(), |currencies, c| {
                currencies.with(&c.code, c.fraction)
            })
    }

    /// Rate source used to normalize historical amounts.
    pub fn rate_source(&self) -> Arc<dyn RateSource> {
        let direct = self
            .rates
            .iter()
            .fold(DirectRateSource::new(), |source, r| {
                source.with(Rate::new(&r.base, &r.reference, r.rate))
            });
        Arc::new(CachedRateSource::new(PivotRateSource::new(
            &self.pivot_currency,
            ReverseRateSource::new(direct),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CurrencyProvider;

    #[test]
    fn defaults_cover_every_limit_name() {
        let settings = LimitSettings::default();
        let defaults = settings.defaults();
        assert_eq!(defaults.len(), LIMIT_NAMES.len());
        assert_eq!(
            defaults[MAX_TOTAL_DEBIT_PER_DAY],
            Value::max(Decimal::ZERO, "EUR")
        );
        assert!(settings.is_enabled(MAX_TOTAL_BALANCE));
        assert!(!LimitSettings::disabled().is_enabled(MAX_TOTAL_BALANCE));
        assert!(!settings.is_enabled("unknown"));
    }

    #[test]
    fn configured_rates_resolve_through_the_pivot() {
        let settings = LedgerSettings {
            rates: vec![
                RateSetting {
                    base: "EUR".to_string(),
                    reference: "USD".to_string(),
                    rate: Decimal::new(12, 1),
                },
                RateSetting {
                    base: "EUR".to_string(),
                    reference: "GBP".to_string(),
                    rate: Decimal::new(8, 1),
                },
            ],
            ..LedgerSettings::default()
        };
        let rates = settings.rate_source();
        assert_eq!(rates.find_rate("GBP", "USD").unwrap().rate, Decimal::new(15, 1));
        assert_eq!(rates.find_rate("EUR", "USD").unwrap().rate, Decimal::new(12, 1));
        assert!(settings.currency_box().get("GBP").is_ok());
    }
}
