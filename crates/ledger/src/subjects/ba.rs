//! Transfers between two accounts (`TBA`, `TBU`).
//!
//! The layout is shared with card funding: an optional hidden conversion
//! margin and the remainder leave the source, an optional fee on the full
//! amount follows, the remainder reaches the destination (exchanged when the
//! currencies differ) and fee and margin land on the revenue account.

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
    transfer::{Amount, Step, Wallet, margin_multiplier},
};

use super::{
    common::{
        Booking, DESTINATION_AMOUNT, EXCHANGE_MARGIN, Leg, Mode, SHOW_AMOUNT, TRANSFER_FEE,
        Transfer, absorb_account, absorb_revenue, description_or, ensure_currency,
        request_currencies, request_rates,
    },
    input,
};

const DEFAULT_DESCRIPTION: &str = "Transfer Between Accounts";

#[derive(Clone, Debug, PartialEq)]
pub struct BetweenAccounts {
    /// Lowercase subject code used in purposes.
    code: String,
    source: Account,
    destination: Account,
    revenue: RevenueAccount,
}

impl BetweenAccounts {
    pub fn new(code: &str, source: Account, destination: Account, revenue: RevenueAccount) -> Self {
        Self {
            code: code.to_ascii_lowercase(),
            source,
            destination,
            revenue,
        }
    }

    pub(crate) async fn load<C: ConnectionTrait>(db: &C, request: &Request) -> ResultEngine<Self> {
        let source = input::id(request, input::SOURCE_ACCOUNT_ID)?;
        let destination = input::id(request, input::DESTINATION_ACCOUNT_ID)?;
        let revenue = input::id(request, input::REVENUE_ACCOUNT_ID)?;
        if source == destination {
            return Err(EngineError::OperationNotSupported(format!(
                "account #{source} cannot transfer to itself"
            )));
        }
        Ok(Self::new(
            &request.subject,
            store::lock_account(db, source).await?,
            store::lock_account(db, destination).await?,
            store::lock_revenue_account(db, revenue).await?,
        ))
    }

    pub fn source(&self) -> &Account {
        &self.source
    }

    pub fn destination(&self) -> &Account {
        &self.destination
    }

    pub fn revenue(&self) -> &RevenueAccount {
        &self.revenue
    }
}

impl Transfer for BetweenAccounts {
    fn owners(&self) -> Vec<Owner> {
        vec![
            Owner::Account(self.source.clone()),
            Owner::Account(self.destination.clone()),
            Owner::RevenueAccount(self.revenue.clone()),
        ]
    }

    fn absorb(&mut self, owners: &[Owner]) {
        absorb_account(owners, &mut self.source);
        absorb_account(owners, &mut self.destination);
        absorb_revenue(owners, &mut self.revenue);
    }

    fn book(
        &self,
        request: &mut Request,
        mode: Mode,
        currencies: &dyn CurrencyProvider,
    ) -> ResultEngine<Booking> {
        book_funding(
            Funding {
                code: &self.code,
                source: &self.source,
                destination: Owner::Account(self.destination.clone()),
                incoming: TransactionType::Account,
                revenue: &self.revenue,
                default_description: DEFAULT_DESCRIPTION,
            },
            request,
            mode,
            currencies,
        )
    }
}

/// Parties of an account-funded transfer.
pub(super) struct Funding<'a> {
    pub code: &'a str,
    pub source: &'a Account,
    pub destination: Owner,
    pub incoming: TransactionType,
    pub revenue: &'a RevenueAccount,
    pub default_description: &'a str,
}

pub(super) fn book_funding(
    funding: Funding<'_>,
    request: &Request,
    mode: Mode,
    currencies: &dyn CurrencyProvider,
) -> ResultEngine<Booking> {
    let (base, reference) = request_currencies(currencies, request)?;
    ensure_currency("source account", &funding.source.currency_code, &base)?;
    ensure_currency("destination", funding.destination.currency_code(), &reference)?;
    ensure_currency("revenue account", &funding.revenue.currency_code, &base)?;

    let amount = request.required_amount()?;
    let margin = margin_multiplier(input::decimal(request, input::EXCHANGE_MARGIN_PERCENT)?);
    let fee = input::fee_params(request)?;
    let description = description_or(request, funding.default_description);
    let code = funding.code;
    let fee_description = format!("Transfer Fee: {} Fee", code.to_ascii_uppercase());

    let mut booking = Booking::new(mode);
    let source = booking.join(Owner::Account(funding.source.clone()));
    let destination = booking.join(funding.destination);
    let revenue = booking.join(Owner::RevenueAccount(funding.revenue.clone()));
    let remainder = booking.pocket(amount);

    let source_wallet = booking.debit_wallet(source, &base)?;
    let destination_wallet = booking.credit_wallet(destination, &reference)?;
    let revenue_wallet = booking.credit_wallet(revenue, &base)?;

    if margin > Decimal::ZERO {
        let from = Wallet::join(vec![
            source_wallet.clone(),
            Wallet::consumable(base.clone(), remainder),
        ])?;
        booking.push(
            Step::debit(Amount::fixed(base.clone(), amount).multiplied(margin), from)
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
        Step::debit(Amount::remainder(base.clone(), remainder), source_wallet.clone())
            .group(SHOW_AMOUNT)
            .tag(
                Leg::new(Purpose::Outgoing(code.to_string()), source, TransactionType::Account)
                    .description(description.clone())
                    .show_group(SHOW_AMOUNT),
            ),
    );

    if let Some(params) = &fee {
        booking.push(
            Step::debit(
                Amount::transfer_fee(params.clone(), Amount::fixed(base.clone(), amount)),
                source_wallet,
            )
            .alias(TRANSFER_FEE)
            .tag(
                Leg::new(Purpose::FeeDefaultTransfer, source, TransactionType::Fee)
                    .description(fee_description.clone()),
            ),
        );
    }

    let incoming = Leg::new(Purpose::Incoming(code.to_string()), destination, funding.incoming)
        .description(description);
    if base == reference {
        booking.push(
            Step::credit(Amount::remainder(base.clone(), remainder), destination_wallet)
                .tag(incoming),
        );
    } else {
        booking
            .push(
                Step::exchange(
                    Amount::remainder(base.clone(), remainder),
                    request_rates(request)?,
                    reference,
                )
                .alias(DESTINATION_AMOUNT),
            )
            .push(Step::credit(Amount::alias(DESTINATION_AMOUNT), destination_wallet).tag(incoming));
    }

    if fee.is_some() {
        booking.push(
            Step::credit(Amount::alias(TRANSFER_FEE), revenue_wallet.clone()).tag(
                Leg::new(
                    Purpose::RevenueTransfer(code.to_string()),
                    revenue,
                    TransactionType::Revenue,
                )
                .description(fee_description),
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
