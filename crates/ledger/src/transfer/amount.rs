use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::{Currency, CurrencyAmount, EngineError, ResultEngine};

use super::{Pockets, TransferFeeParams, wallet::PocketId};

/// Amount of a transfer step, resolved when the step performs.
#[derive(Clone, Debug)]
pub enum Amount {
    Fixed(CurrencyAmount),
    /// `top × multiplier`.
    Multiplied(Box<Amount>, Decimal),
    /// What is left of a consumable pocket.
    Remainder { currency: Currency, pocket: PocketId },
    /// Result of a previously performed step.
    Alias(String),
    TransferFee(TransferFeeParams, Box<Amount>),
}

impl Amount {
    pub fn fixed(currency: Currency, amount: Decimal) -> Self {
        Self::Fixed(CurrencyAmount::new(currency, amount))
    }

    pub fn multiplied(self, multiplier: Decimal) -> Self {
        Self::Multiplied(Box::new(self), multiplier)
    }

    pub fn remainder(currency: Currency, pocket: PocketId) -> Self {
        Self::Remainder { currency, pocket }
    }

    pub fn alias(name: &str) -> Self {
        Self::Alias(name.to_string())
    }

    pub fn transfer_fee(params: TransferFeeParams, of: Amount) -> Self {
        Self::TransferFee(params, Box::new(of))
    }

    pub(crate) fn resolve(
        &self,
        pockets: &Pockets,
        aliases: &HashMap<String, CurrencyAmount>,
    ) -> ResultEngine<CurrencyAmount> {
        match self {
            Self::Fixed(amount) => Ok(amount.clone()),
            Self::Multiplied(top, multiplier) => {
                let top = top.resolve(pockets, aliases)?;
                Ok(CurrencyAmount::new(top.currency, top.amount * multiplier))
            }
            Self::Remainder { currency, pocket } => {
                Ok(CurrencyAmount::new(currency.clone(), pockets.get(*pocket)?))
            }
            Self::Alias(name) => aliases
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::KeyNotFound(name.clone())),
            Self::TransferFee(params, of) => Ok(params.fee(&of.resolve(pockets, aliases)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn eur() -> Currency {
        Currency::new("EUR", 2)
    }

    #[test]
    fn expressions_resolve_against_current_state() {
        let mut pockets = Pockets::new();
        let pocket = pockets.add(dec("90"));
        let mut aliases = HashMap::new();
        aliases.insert(
            "margin".to_string(),
            CurrencyAmount::new(eur(), dec("10")),
        );

        let fixed = Amount::fixed(eur(), dec("100"));
        assert_eq!(
            fixed.clone().multiplied(dec("0.1")).resolve(&pockets, &aliases).unwrap().amount,
            dec("10")
        );
        assert_eq!(
            Amount::remainder(eur(), pocket).resolve(&pockets, &aliases).unwrap().amount,
            dec("90")
        );
        assert_eq!(
            Amount::alias("margin").resolve(&pockets, &aliases).unwrap().amount,
            dec("10")
        );
        let fee = TransferFeeParams {
            base: dec("10"),
            percent: dec("25"),
            ..TransferFeeParams::default()
        };
        assert_eq!(
            Amount::transfer_fee(fee, fixed).resolve(&pockets, &aliases).unwrap().amount,
            dec("35")
        );
    }

    #[test]
    fn unknown_alias_is_reported() {
        let result = Amount::alias("missing").resolve(&Pockets::new(), &HashMap::new());
        assert_eq!(result, Err(EngineError::KeyNotFound("missing".to_string())));
    }
}
