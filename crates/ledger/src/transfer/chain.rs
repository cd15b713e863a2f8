use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;

use crate::{Currency, CurrencyAmount, EngineError, ResultEngine, exchange::RateSource};

use super::{Amount, Pockets, Wallet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Debit,
    Credit,
    Exchange,
}

impl ActionKind {
    /// Direction of the action: debit -1, credit +1, exchange 0.
    pub fn sign(self) -> i8 {
        match self {
            Self::Debit => -1,
            Self::Credit => 1,
            Self::Exchange => 0,
        }
    }

    fn signed(self, amount: Decimal) -> Decimal {
        amount * Decimal::from(self.sign())
    }
}

enum Target {
    Debit(Wallet),
    Credit(Wallet),
    Exchange {
        rates: Arc<dyn RateSource>,
        to: Currency,
    },
}

impl core::fmt::Debug for Target {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Debit(wallet) => f.debug_tuple("Debit").field(wallet).finish(),
            Self::Credit(wallet) => f.debug_tuple("Credit").field(wallet).finish(),
            Self::Exchange { to, .. } => f.debug_struct("Exchange").field("to", to).finish(),
        }
    }
}

/// One step of a transfer chain.
#[derive(Debug)]
pub struct Step<T> {
    target: Target,
    amount: Amount,
    alias: Option<String>,
    groups: Vec<String>,
    tag: Option<T>,
}

impl<T> Step<T> {
    fn new(target: Target, amount: Amount) -> Self {
        Self {
            target,
            amount,
            alias: None,
            groups: Vec::new(),
            tag: None,
        }
    }

    pub fn debit(amount: Amount, from: Wallet) -> Self {
        Self::new(Target::Debit(from), amount)
    }

    pub fn credit(amount: Amount, to: Wallet) -> Self {
        Self::new(Target::Credit(to), amount)
    }

    pub fn exchange(amount: Amount, rates: Arc<dyn RateSource>, to: Currency) -> Self {
        Self::new(Target::Exchange { rates, to }, amount)
    }

    /// Name the realized amount so later steps can reuse it.
    pub fn alias(mut self, name: &str) -> Self {
        self.alias = Some(name.to_string());
        self
    }

    pub fn group(mut self, name: &str) -> Self {
        self.groups.push(name.to_string());
        self
    }

    /// Attach a value handed back to the callback once the step performed.
    pub fn tag(mut self, tag: T) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Running sums of grouped actions.
#[derive(Debug, Default)]
pub struct Groups {
    members: HashMap<String, Vec<(ActionKind, Decimal)>>,
}

impl Groups {
    /// Signed sum of the performed actions in the group, zero when empty.
    pub fn sum(&self, name: &str) -> Decimal {
        self.members
            .get(name)
            .map(|actions| {
                actions
                    .iter()
                    .map(|(kind, amount)| kind.signed(*amount))
                    .sum()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, name: &str) -> usize {
        self.members.get(name).map_or(0, Vec::len)
    }

    fn record(&mut self, name: &str, kind: ActionKind, amount: Decimal) {
        self.members
            .entry(name.to_string())
            .or_default()
            .push((kind, amount));
    }
}

/// A step that just performed, as seen by the chain callback.
#[derive(Debug)]
pub struct Performed<'a, T> {
    pub kind: ActionKind,
    pub amount: CurrencyAmount,
    pub tag: Option<T>,
    pub groups: &'a Groups,
    pub pockets: &'a Pockets,
}

impl<T> Performed<'_, T> {
    /// Realized amount with the action sign applied.
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount.amount)
    }
}

/// Ordered list of transfer steps.
#[derive(Debug)]
pub struct Chain<T> {
    steps: Vec<Step<T>>,
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<T> Chain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step<T>) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Perform every step in declaration order, stopping at the first error.
    ///
    /// A zero amount skips the wallet call but the step still counts as
    /// performed. The chain is consumed; pockets keep whatever the steps
    /// before a failure did, so callers discard them on error.
    pub fn execute<F>(self, pockets: &mut Pockets, mut on_performed: F) -> ResultEngine<Groups>
    where
        F: FnMut(Performed<'_, T>) -> ResultEngine<()>,
    {
        let mut aliases: HashMap<String, CurrencyAmount> = HashMap::new();
        let mut groups = Groups::default();

        for step in self.steps {
            let amount = step.amount.resolve(pockets, &aliases)?;
            if amount.amount < Decimal::ZERO {
                return Err(EngineError::InvalidAmount(format!(
                    "step amount must not be negative: got {} {}",
                    amount.amount,
                    amount.currency_code()
                )));
            }

            let (kind, realized) = match &step.target {
                Target::Debit(wallet) => {
                    if !amount.amount.is_zero() {
                        wallet.debit(pockets, &amount)?;
                    }
                    (ActionKind::Debit, amount)
                }
                Target::Credit(wallet) => {
                    if !amount.amount.is_zero() {
                        wallet.credit(pockets, &amount)?;
                    }
                    (ActionKind::Credit, amount)
                }
                Target::Exchange { rates, to } => {
                    let rate = rates
                        .find_rate(amount.currency_code(), to.code())
                        .map_err(|err| match err {
                            EngineError::RateNotFound(msg) => EngineError::RateNotFound(format!(
                                "failed to exchange {} to {}: {msg}",
                                amount.currency_code(),
                                to.code()
                            )),
                            other => other,
                        })?;
                    (
                        ActionKind::Exchange,
                        CurrencyAmount::new(to.clone(), amount.amount * rate.rate),
                    )
                }
            };

            for group in &step.groups {
                groups.record(group, kind, realized.amount);
            }
            if let Some(alias) = &step.alias {
                aliases.insert(alias.clone(), realized.clone());
            }
            on_performed(Performed {
                kind,
                amount: realized,
                tag: step.tag,
                groups: &groups,
                pockets: &*pockets,
            })?;
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        exchange::{DirectRateSource, Rate},
        transfer::TransferFeeParams,
    };

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn eur() -> Currency {
        Currency::new("EUR", 2)
    }

    fn usd() -> Currency {
        Currency::new("USD", 2)
    }

    fn eur_usd(rate: &str) -> Arc<dyn RateSource> {
        Arc::new(DirectRateSource::new().with(Rate::new("EUR", "USD", dec(rate))))
    }

    #[test]
    fn exchange_then_credit_alias() {
        let mut pockets = Pockets::new();
        let source = pockets.add(dec("100"));
        let destination = pockets.add(dec("100"));
        let debit = Amount::fixed(eur(), dec("10"));

        let mut chain: Chain<()> = Chain::new();
        chain
            .push(Step::debit(debit.clone(), Wallet::linked(eur(), source)))
            .push(Step::exchange(debit, eur_usd("1.1"), usd()).alias("debitInUsd"))
            .push(Step::credit(
                Amount::alias("debitInUsd"),
                Wallet::linked(usd(), destination),
            ));
        assert_eq!(chain.len(), 3);
        chain.execute(&mut pockets, |_| Ok(())).unwrap();

        assert_eq!(pockets.get(source).unwrap(), dec("90"));
        assert_eq!(pockets.get(destination).unwrap(), dec("111"));
    }

    #[test]
    fn fee_from_alias_goes_to_revenue() {
        let mut pockets = Pockets::new();
        let source = pockets.add(dec("100"));
        let destination = pockets.add(dec("100"));
        let revenue = pockets.add(dec("100"));
        let fee = TransferFeeParams {
            percent: dec("10"),
            ..TransferFeeParams::default()
        };

        let mut chain: Chain<()> = Chain::new();
        chain
            .push(
                Step::debit(
                    Amount::fixed(eur(), dec("100")),
                    Wallet::linked(eur(), source),
                )
                .alias("debit1"),
            )
            .push(
                Step::debit(
                    Amount::transfer_fee(fee, Amount::alias("debit1")),
                    Wallet::linked(eur(), source),
                )
                .alias("fee10%"),
            )
            .push(Step::credit(
                Amount::alias("debit1"),
                Wallet::linked(eur(), destination),
            ))
            .push(Step::credit(
                Amount::alias("fee10%"),
                Wallet::linked(eur(), revenue),
            ));
        chain.execute(&mut pockets, |_| Ok(())).unwrap();

        assert_eq!(pockets.get(source).unwrap(), dec("-10"));
        assert_eq!(pockets.get(destination).unwrap(), dec("200"));
        assert_eq!(pockets.get(revenue).unwrap(), dec("110"));
    }

    #[test]
    fn callback_receives_tag_sign_and_post_step_balances() {
        let mut pockets = Pockets::new();
        let source = pockets.add(dec("500"));
        let destination = pockets.add(dec("0"));

        let mut chain = Chain::new();
        chain
            .push(
                Step::debit(
                    Amount::fixed(eur(), dec("500")),
                    Wallet::linked(eur(), source),
                )
                .alias("d1")
                .tag("debit"),
            )
            .push(
                Step::credit(Amount::alias("d1"), Wallet::linked(eur(), destination))
                    .tag("credit"),
            );

        let mut seen = Vec::new();
        chain
            .execute(&mut pockets, |performed| {
                let snapshot = performed.pockets.get(source)?;
                seen.push((performed.tag, performed.signed_amount(), snapshot));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (Some("debit"), dec("-500"), dec("0")),
                (Some("credit"), dec("500"), dec("0")),
            ]
        );
    }

    #[test]
    fn groups_sum_signed_amounts() {
        let mut pockets = Pockets::new();
        let wallet = Wallet::linked(usd(), pockets.add(dec("100")));

        let mut chain: Chain<()> = Chain::new();
        chain
            .push(Step::debit(Amount::fixed(usd(), dec("10")), wallet.clone()).group("total"))
            .push(Step::debit(Amount::fixed(usd(), dec("20")), wallet.clone()).group("total"))
            .push(Step::credit(Amount::fixed(usd(), dec("5")), wallet).group("total"));

        let mut running = Vec::new();
        let groups = chain
            .execute(&mut pockets, |performed| {
                running.push(performed.groups.sum("total"));
                Ok(())
            })
            .unwrap();

        assert_eq!(running, vec![dec("-10"), dec("-30"), dec("-25")]);
        assert_eq!(groups.sum("total"), dec("-25"));
        assert_eq!(groups.len("total"), 3);
        assert_eq!(groups.sum("unknown"), Decimal::ZERO);
    }

    #[test]
    fn remainder_is_split_between_margin_and_outgoing() {
        let mut pockets = Pockets::new();
        let source = pockets.add(dec("1000"));
        let remainder = pockets.add(dec("100"));
        let source_wallet = Wallet::linked(eur(), source);
        let margin_from =
            Wallet::join(vec![source_wallet.clone(), Wallet::consumable(eur(), remainder)])
                .unwrap();

        let mut chain: Chain<()> = Chain::new();
        chain
            .push(
                Step::debit(
                    Amount::fixed(eur(), dec("100")).multiplied(dec("0.1")),
                    margin_from,
                )
                .group("showAmount"),
            )
            .push(
                Step::debit(Amount::remainder(eur(), remainder), source_wallet)
                    .group("showAmount"),
            );
        let groups = chain.execute(&mut pockets, |_| Ok(())).unwrap();

        assert_eq!(pockets.get(source).unwrap(), dec("900"));
        assert_eq!(pockets.get(remainder).unwrap(), dec("90"));
        assert_eq!(groups.sum("showAmount"), dec("-100"));
    }

    #[test]
    fn zero_amount_skips_wallet_but_still_performs() {
        let mut pockets = Pockets::new();
        let source = pockets.add(dec("10"));

        let mut chain: Chain<()> = Chain::new();
        chain.push(Step::debit(
            Amount::fixed(eur(), Decimal::ZERO),
            Wallet::consumable(eur(), source),
        ));
        let mut calls = 0;
        chain
            .execute(&mut pockets, |_| {
                calls += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(pockets.get(source).unwrap(), dec("10"));
    }

    #[test]
    fn first_error_aborts_execution() {
        let mut pockets = Pockets::new();
        let source = pockets.add(dec("10"));

        let mut chain: Chain<()> = Chain::new();
        chain
            .push(Step::debit(
                Amount::fixed(eur(), dec("-1")),
                Wallet::linked(eur(), source),
            ))
            .push(Step::debit(
                Amount::fixed(eur(), dec("5")),
                Wallet::linked(eur(), source),
            ));
        let mut calls = 0;
        let result = chain.execute(&mut pockets, |_| {
            calls += 1;
            Ok(())
        });

        assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
        assert_eq!(calls, 0);
        assert_eq!(pockets.get(source).unwrap(), dec("10"));
    }

    #[test]
    fn missing_rate_and_unknown_alias_fail() {
        let mut pockets = Pockets::new();
        let destination = pockets.add(dec("0"));

        let mut chain: Chain<()> = Chain::new();
        chain.push(Step::exchange(
            Amount::fixed(usd(), dec("1")),
            eur_usd("1.1"),
            eur(),
        ));
        assert!(matches!(
            chain.execute(&mut pockets, |_| Ok(())),
            Err(EngineError::RateNotFound(_))
        ));

        let mut chain: Chain<()> = Chain::new();
        chain.push(Step::credit(
            Amount::alias("nothing"),
            Wallet::linked(eur(), destination),
        ));
        assert_eq!(
            chain.execute(&mut pockets, |_| Ok(())).err(),
            Some(EngineError::KeyNotFound("nothing".to_string()))
        );
    }

    #[test]
    fn callback_error_stops_the_chain() {
        let mut pockets = Pockets::new();
        let source = pockets.add(dec("10"));

        let mut chain: Chain<()> = Chain::new();
        chain
            .push(Step::debit(
                Amount::fixed(eur(), dec("1")),
                Wallet::linked(eur(), source),
            ))
            .push(Step::debit(
                Amount::fixed(eur(), dec("1")),
                Wallet::linked(eur(), source),
            ));
        let result = chain.execute(&mut pockets, |_| {
            Err(EngineError::DuplicatePurpose("any_outgoing".to_string()))
        });

        assert!(matches!(result, Err(EngineError::DuplicatePurpose(_))));
        assert_eq!(pockets.get(source).unwrap(), dec("9"));
    }
}
