use rust_decimal::Decimal;
use serde_json::Value;

use crate::{CurrencyAmount, EngineError, ResultEngine, util::decimal_from_json};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Transfer fee formula.
///
/// `min` and `max` bound the percentage part and only apply when `percent`
/// is positive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferFeeParams {
    pub base: Decimal,
    pub percent: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

impl TransferFeeParams {
    /// Read the params from a request input value. `null` means no fee.
    pub fn from_json(value: &Value) -> ResultEngine<Option<Self>> {
        let object = match value {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            other => {
                return Err(EngineError::MissingInputData(format!(
                    "transferFeeParams must be an object, got {other}"
                )));
            }
        };
        let field = |name: &str| -> ResultEngine<Decimal> {
            match object.get(name) {
                None | Some(Value::Null) => Ok(Decimal::ZERO),
                Some(v) => decimal_from_json(v, &format!("transferFeeParams.{name}")),
            }
        };
        Ok(Some(Self {
            base: field("base")?,
            percent: field("percent")?,
            min: field("min")?,
            max: field("max")?,
        }))
    }

    /// Fee charged for `amount`, expressed in the same currency.
    pub fn fee(&self, amount: &CurrencyAmount) -> CurrencyAmount {
        let mut total = self.base;
        if self.percent > Decimal::ZERO {
            let mut percent_fee = amount.amount * self.percent / HUNDRED;
            if self.min > Decimal::ZERO && percent_fee < self.min {
                percent_fee = self.min;
            }
            if self.max > Decimal::ZERO && percent_fee > self.max {
                percent_fee = self.max;
            }
            total += percent_fee;
        }
        CurrencyAmount::new(amount.currency.clone(), total)
    }
}

/// Multiplier turning a margin percentage into a fraction of the debit.
pub fn margin_multiplier(percent: Decimal) -> Decimal {
    percent / HUNDRED
}
