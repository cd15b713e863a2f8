//! Outgoing wire transfers (`OWT`).
//!
//! The customer states the amount to send in the reference currency
//! (`input_amount`). It is converted into the account currency with the
//! request rate, and the converted value becomes the request amount. Money
//! leaves the platform, so there is no destination owner.

use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;

use crate::{
    CurrencyProvider, EngineError, ResultEngine,
    accounts::Account,
    details::{Owner, Purpose},
    requests::Request,
    revenue_accounts::RevenueAccount,
    store,
    transactions::TransactionType,
    transfer::{Amount, Chain, Pockets, Step, margin_multiplier},
};

use super::{
    common::{
        Booking, EXCHANGE_MARGIN, Leg, Mode, SHOW_AMOUNT, TRANSFER_FEE, Transfer,
        absorb_account, absorb_revenue, description_or, ensure_currency, request_currencies,
        request_rates,
    },
    input,
};

const CODE: &str = "owt";
const DEFAULT_DESCRIPTION: &str = "Outgoing Wire Transfer";
const FEE_DESCRIPTION: &str = "Transfer Fee: OWT Fee";

#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingWire {
    source: Account,
    revenue: RevenueAccount,
}

impl OutgoingWire {
    pub fn new(source: Account, revenue: RevenueAccount) -> Self {
        Self { source, revenue }
    }

    pub(crate) async fn load<C: ConnectionTrait>(db: &C, request: &Request) -> ResultEngine<Self> {
        let source = input::id(request, input::SOURCE_ACCOUNT_ID)?;
        let revenue = input::id(request, input::REVENUE_ACCOUNT_ID)?;
        Ok(Self::new(
            store::lock_account(db, source).await?,
            store::lock_revenue_account(db, revenue).await?,
        ))
    }

    pub fn source(&self) -> &Account {
        &self.source
    }

    pub fn revenue(&self) -> &RevenueAccount {
        &self.revenue
    }
}

/// `input_amount` expressed in the base currency.
fn converted_amount(request: &Request, currencies: &dyn CurrencyProvider) -> ResultEngine<Decimal> {
    if request.rate.is_none() {
        return Err(EngineError::MissingRequestData(format!(
            "request #{} has no rate",
            request.id
        )));
    }
    let input_amount = request.input_amount.ok_or_else(|| {
        EngineError::MissingRequestData(format!("request #{} has no input amount", request.id))
    })?;
    let (base, reference) = request_currencies(currencies, request)?;

    let mut chain: Chain<()> = Chain::new();
    chain.push(Step::exchange(
        Amount::fixed(reference, input_amount),
        request_rates(request)?,
        base,
    ));
    let mut converted = Decimal::ZERO;
    chain.execute(&mut Pockets::new(), |performed| {
        converted = performed.amount.amount;
        Ok(())
    })?;
    Ok(converted)
}

impl Transfer for OutgoingWire {
    const DERIVES_AMOUNT: bool = true;

    fn owners(&self) -> Vec<Owner> {
        vec![
            Owner::Account(self.source.clone()),
            Owner::RevenueAccount(self.revenue.clone()),
        ]
    }

    fn absorb(&mut self, owners: &[Owner]) {
        absorb_account(owners, &mut self.source);
        absorb_revenue(owners, &mut self.revenue);
    }

    fn book(
        &self,
        request: &mut Request,
        mode: Mode,
        currencies: &dyn CurrencyProvider,
    ) -> ResultEngine<Booking> {
        let amount = converted_amount(request, currencies)?;
        request.amount = Some(amount);

        let (base, _) = request_currencies(currencies, request)?;
        ensure_currency("source account", &self.source.currency_code, &base)?;
        ensure_currency("revenue account", &self.revenue.currency_code, &base)?;

        let margin = margin_multiplier(input::decimal(request, input::EXCHANGE_MARGIN_PERCENT)?);
        let fee = input::fee_params(request)?;
        let description = format!(
            "{} {} {} {} {}",
            description_or(request, DEFAULT_DESCRIPTION),
            request.rate_reference_currency_code(),
            amount.round_dp(2).normalize(),
            input::text(request, input::BENEFICIARY_NAME)?,
            input::text(request, input::REF_MESSAGE)?,
        );

        let mut booking = Booking::new(mode);
        let source = booking.join(Owner::Account(self.source.clone()));
        let revenue = booking.join(Owner::RevenueAccount(self.revenue.clone()));
        let source_wallet = booking.debit_wallet(source, &base)?;
        let revenue_wallet = booking.credit_wallet(revenue, &base)?;

        if margin > Decimal::ZERO {
            booking.push(
                Step::debit(
                    Amount::fixed(base.clone(), amount).multiplied(margin),
                    source_wallet.clone(),
                )
                .group(SHOW_AMOUNT)
                .alias(EXCHANGE_MARGIN)
                .tag(
                    Leg::new(Purpose::FeeExchangeMargin, source, TransactionType::Fee)
                        .description("Conversion Margin")
                        .hidden(),
                ),
            );
        }

        booking.push(
            Step::debit(Amount::fixed(base.clone(), amount), source_wallet.clone())
                .group(SHOW_AMOUNT)
                .tag(
                    Leg::new(Purpose::Outgoing(CODE.to_string()), source, TransactionType::Account)
                        .description(description)
                        .show_group(SHOW_AMOUNT),
                ),
        );

        if let Some(params) = fee {
            booking
                .push(
                    Step::debit(
                        Amount::transfer_fee(params, Amount::fixed(base.clone(), amount)),
                        source_wallet,
                    )
                    .alias(TRANSFER_FEE)
                    .tag(
                        Leg::new(Purpose::FeeDefaultTransfer, source, TransactionType::Fee)
                            .description(FEE_DESCRIPTION)
                            .skip_zero(),
                    ),
                )
                .push(
                    Step::credit(Amount::alias(TRANSFER_FEE), revenue_wallet.clone()).tag(
                        Leg::new(
                            Purpose::RevenueTransfer(CODE.to_string()),
                            revenue,
                            TransactionType::Revenue,
                        )
                        .description(FEE_DESCRIPTION)
                        .skip_zero(),
                    ),
                );
        }

        if margin > Decimal::ZERO {
            booking.push(
                Step::credit(Amount::alias(EXCHANGE_MARGIN), revenue_wallet).tag(
                    Leg::new(Purpose::RevenueExchangeMargin, revenue, TransactionType::Revenue)
                        .description("Conversion margin"),
                ),
            );
        }
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        currency::CurrencyBox,
        details::tests::account,
        requests::RateDesignation,
        subjects::common::evaluate,
    };

    fn subject() -> OutgoingWire {
        OutgoingWire::new(
            account(1, "u1", "EUR"),
            RevenueAccount {
                id: 1,
                currency_code: "EUR".to_string(),
                balance: Decimal::ZERO,
                available_amount: Decimal::ZERO,
                is_default: true,
            },
        )
    }

    fn request() -> Request {
        Request::new("u1", "OWT", "EUR", "USD")
            .with_input_amount(Decimal::from(125))
            .with_rate("1.25".parse().unwrap(), RateDesignation::BaseReference)
            .with_input(input::EXCHANGE_MARGIN_PERCENT, json!(0))
            .with_input(input::TRANSFER_FEE_PARAMS, json!({"base": 0}))
            .with_input(input::BENEFICIARY_NAME, json!("ACME Ltd"))
            .with_input(input::REF_MESSAGE, json!("invoice 42"))
    }

    fn currencies() -> CurrencyBox {
        CurrencyBox::new().with("EUR", 2).with("USD", 2)
    }

    #[test]
    fn input_amount_is_converted_into_the_request_amount() {
        let mut subject = subject();
        let mut request = request();

        let details = evaluate(&mut subject, &mut request, Mode::Evaluate, &currencies()).unwrap();

        assert_eq!(request.amount, Some(Decimal::from(100)));
        assert_eq!(subject.source().balance, Decimal::from(900));
        // a zero fee books no legs
        assert_eq!(details.len(), 1);
        let outgoing = details.get(&Purpose::Outgoing(CODE.into())).unwrap();
        assert_eq!(
            outgoing.transaction.description.as_deref(),
            Some("Outgoing Wire Transfer USD 100 ACME Ltd invoice 42")
        );
    }

    #[test]
    fn margin_and_fee_are_charged_on_the_converted_amount() {
        let mut subject = subject();
        let mut request = request()
            .with_input(input::EXCHANGE_MARGIN_PERCENT, json!(2))
            .with_input(input::TRANSFER_FEE_PARAMS, json!({"base": 5}))
            .with_description("Wire");

        let details = evaluate(&mut subject, &mut request, Mode::Evaluate, &currencies()).unwrap();

        assert_eq!(details.len(), 5);
        assert_eq!(subject.source().balance, Decimal::from(893));
        assert_eq!(subject.revenue().balance, Decimal::from(7));
        let outgoing = details.get(&Purpose::Outgoing(CODE.into())).unwrap();
        assert_eq!(outgoing.transaction.show_amount, Some(Decimal::from(-102)));
        assert!(outgoing
            .transaction
            .description
            .as_deref()
            .is_some_and(|d| d.starts_with("Wire USD")));
        assert!(details.get(&Purpose::RevenueTransfer(CODE.into())).is_some());
    }

    #[test]
    fn rate_and_input_amount_are_required() {
        let mut subject = subject();
        let mut request = request();
        request.rate = None;
        assert!(matches!(
            evaluate(&mut subject, &mut request, Mode::Evaluate, &currencies()),
            Err(EngineError::MissingRequestData(_))
        ));

        let mut request = request_without_input_amount();
        assert!(matches!(
            evaluate(&mut subject, &mut request, Mode::Evaluate, &currencies()),
            Err(EngineError::MissingRequestData(_))
        ));
    }

    fn request_without_input_amount() -> Request {
        let mut request = request();
        request.input_amount = None;
        request
    }
}
