//! Typed access to the keyed parameters a request carries in `input`.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    EngineError, ResultEngine, requests::Request, transfer::TransferFeeParams,
    util::decimal_from_json,
};

pub(crate) const SOURCE_ACCOUNT_ID: &str = "sourceAccountId";
pub(crate) const DESTINATION_ACCOUNT_ID: &str = "destinationAccountId";
pub(crate) const DESTINATION_CARD_ID: &str = "destinationCardId";
pub(crate) const REVENUE_ACCOUNT_ID: &str = "revenueAccountId";
pub(crate) const ACCOUNT_ID: &str = "accountId";
pub(crate) const EXCHANGE_MARGIN_PERCENT: &str = "exchangeMarginPercent";
pub(crate) const TRANSFER_FEE_PARAMS: &str = "transferFeeParams";
pub(crate) const BENEFICIARY_NAME: &str = "beneficiaryCustomerAccountName";
pub(crate) const REF_MESSAGE: &str = "refMessage";
pub(crate) const APPLY_IWT_FEE: &str = "applyIwtFee";
pub(crate) const DEBIT_FROM_REVENUE: &str = "debitFromRevenueAccount";
pub(crate) const CREDIT_TO_REVENUE: &str = "creditToRevenueAccount";
pub(crate) const ALLOW_NEGATIVE_BALANCE: &str = "allowNegativeBalance";

fn missing(key: &str) -> EngineError {
    EngineError::MissingInputData(format!("request input must contain \"{key}\" field"))
}

/// A positive owner id, given as a number or a numeric string.
pub(crate) fn id(request: &Request, key: &str) -> ResultEngine<i64> {
    let id = match request.input.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0).ok_or_else(|| missing(key))
}

pub(crate) fn decimal(request: &Request, key: &str) -> ResultEngine<Decimal> {
    match request.input.get(key) {
        None => Err(missing(key)),
        Some(Value::Null) => Ok(Decimal::ZERO),
        Some(value) => decimal_from_json(value, key),
    }
}

/// Absent flags are off.
pub(crate) fn flag(request: &Request, key: &str) -> ResultEngine<bool> {
    match request.input.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(other) => Err(EngineError::MissingInputData(format!(
            "parameter \"{key}\" must be a boolean, got {other}"
        ))),
    }
}

pub(crate) fn text(request: &Request, key: &str) -> ResultEngine<String> {
    match request.input.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
        None => Err(missing(key)),
    }
}

/// The key has to be present; `null` means no fee.
pub(crate) fn fee_params(request: &Request) -> ResultEngine<Option<TransferFeeParams>> {
    let value = request
        .input
        .get(TRANSFER_FEE_PARAMS)
        .ok_or_else(|| missing(TRANSFER_FEE_PARAMS))?;
    TransferFeeParams::from_json(value)
}
