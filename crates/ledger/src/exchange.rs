//! Exchange rates and the sources they are looked up from.
//!
//! Sources compose: a [`DirectRateSource`] holds the known pairs,
//! [`ReverseRateSource`] answers the inverted pairs, [`PivotRateSource`]
//! derives cross rates through a pivot currency and [`CachedRateSource`]
//! memoizes successful lookups of any source.

use std::{collections::HashMap, sync::Mutex};

use rust_decimal::Decimal;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rate {
    pub base: String,
    pub reference: String,
    pub rate: Decimal,
}

impl Rate {
    pub fn new(base: &str, reference: &str, rate: Decimal) -> Self {
        Self {
            base: base.to_string(),
            reference: reference.to_string(),
            rate,
        }
    }
}

pub trait RateSource: Send + Sync {
    /// Finds the rate converting one unit of `base` into `reference`.
    fn find_rate(&self, base: &str, reference: &str) -> ResultEngine<Rate>;
}

impl<S: RateSource + ?Sized> RateSource for std::sync::Arc<S> {
    fn find_rate(&self, base: &str, reference: &str) -> ResultEngine<Rate> {
        (**self).find_rate(base, reference)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DirectRateSource {
    rates: HashMap<String, HashMap<String, Rate>>,
}

impl DirectRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, rate: Rate) {
        self.rates
            .entry(rate.base.clone())
            .or_default()
            .insert(rate.reference.clone(), rate);
    }

    pub fn with(mut self, rate: Rate) -> Self {
        self.set(rate);
        self
    }
}

impl RateSource for DirectRateSource {
    fn find_rate(&self, base: &str, reference: &str) -> ResultEngine<Rate> {
        if base == reference {
            return Ok(Rate::new(base, reference, Decimal::ONE));
        }
        self.rates
            .get(base)
            .and_then(|by_reference| by_reference.get(reference))
            .cloned()
            .ok_or_else(|| {
                EngineError::RateNotFound(format!("direct rate not found {base} -> {reference}"))
            })
    }
}

#[derive(Debug)]
pub struct ReverseRateSource<S> {
    inner: S,
}

impl<S: RateSource> ReverseRateSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: RateSource> RateSource for ReverseRateSource<S> {
    fn find_rate(&self, base: &str, reference: &str) -> ResultEngine<Rate> {
        match self.inner.find_rate(base, reference) {
            Ok(rate) => Ok(rate),
            Err(EngineError::RateNotFound(_)) => {
                let reverse = self.inner.find_rate(reference, base).map_err(|err| match err {
                    EngineError::RateNotFound(msg) => EngineError::RateNotFound(format!(
                        "failed to find reverse rate {base} -> {reference}: {msg}"
                    )),
                    other => other,
                })?;
                if reverse.rate.is_zero() {
                    return Err(EngineError::InvalidAmount(format!(
                        "zero rate {reference} -> {base} cannot be reversed"
                    )));
                }
                Ok(Rate::new(base, reference, Decimal::ONE / reverse.rate))
            }
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug)]
pub struct PivotRateSource<S> {
    pivot: String,
    inner: S,
}

impl<S: RateSource> PivotRateSource<S> {
    pub fn new(pivot: &str, inner: S) -> Self {
        Self {
            pivot: pivot.to_string(),
            inner,
        }
    }
}

impl<S: RateSource> RateSource for PivotRateSource<S> {
    fn find_rate(&self, base: &str, reference: &str) -> ResultEngine<Rate> {
        if base == self.pivot {
            return self.inner.find_rate(base, reference);
        }
        let base_rate = self.inner.find_rate(&self.pivot, base)?;
        let reference_rate = self.inner.find_rate(&self.pivot, reference)?;
        if base_rate.rate.is_zero() {
            return Err(EngineError::InvalidAmount(format!(
                "zero pivot rate {} -> {base}",
                self.pivot
            )));
        }
        Ok(Rate::new(
            base,
            reference,
            reference_rate.rate / base_rate.rate,
        ))
    }
}

#[derive(Debug)]
pub struct CachedRateSource<S> {
    inner: S,
    cache: Mutex<DirectRateSource>,
}

impl<S: RateSource> CachedRateSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(DirectRateSource::new()),
        }
    }
}

impl<S: RateSource> RateSource for CachedRateSource<S> {
    fn find_rate(&self, base: &str, reference: &str) -> ResultEngine<Rate> {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Ok(rate) = cache.find_rate(base, reference) {
            return Ok(rate);
        }
        let rate = self.inner.find_rate(base, reference)?;
        cache.set(rate.clone());
        Ok(rate)
    }
}
