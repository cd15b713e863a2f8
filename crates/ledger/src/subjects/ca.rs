//! Crediting an account from outside the platform (`CA`), optionally funded
//! from a revenue account and optionally charged the incoming wire fee.

use sea_orm::ConnectionTrait;

use crate::{
    CurrencyProvider, ResultEngine,
    accounts::Account,
    details::{Owner, Purpose},
    requests::Request,
    revenue_accounts::RevenueAccount,
    store,
    transactions::TransactionType,
    transfer::{Amount, Step, TransferFeeParams},
};

use super::{
    common::{
        Booking, Leg, Mode, TRANSFER_FEE, Transfer, absorb_account, absorb_revenue,
        ensure_currency, request_currencies,
    },
    input,
};

const FEE_DESCRIPTION: &str = "Transfer Fee: IWT Fee";

#[derive(Clone, Debug, PartialEq)]
pub struct CreditAccount {
    account: Account,
    /// Present when the request debits revenue or applies the IWT fee.
    revenue: Option<RevenueAccount>,
    debit_revenue: bool,
    iwt_fee: Option<TransferFeeParams>,
}

impl CreditAccount {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            revenue: None,
            debit_revenue: false,
            iwt_fee: None,
        }
    }

    /// Fund the credit from the revenue account.
    pub fn debit_revenue(mut self, revenue: RevenueAccount) -> Self {
        self.revenue = Some(revenue);
        self.debit_revenue = true;
        self
    }

    /// Charge the IWT fee, collected on the revenue account.
    pub fn iwt_fee(mut self, revenue: RevenueAccount, params: TransferFeeParams) -> Self {
        self.revenue = Some(revenue);
        self.iwt_fee = Some(params);
        self
    }

    pub(crate) async fn load<C: ConnectionTrait>(db: &C, request: &Request) -> ResultEngine<Self> {
        let account = store::lock_account(db, input::id(request, input::ACCOUNT_ID)?).await?;
        let apply_fee = input::flag(request, input::APPLY_IWT_FEE)?;
        let debit_revenue = input::flag(request, input::DEBIT_FROM_REVENUE)?;
        let mut subject = Self::new(account);
        if !(apply_fee || debit_revenue) {
            return Ok(subject);
        }

        let revenue_id = input::id(request, input::REVENUE_ACCOUNT_ID)?;
        let revenue = store::lock_revenue_account(db, revenue_id).await?;
        if debit_revenue {
            subject = subject.debit_revenue(revenue.clone());
        }
        if apply_fee && let Some(params) = input::fee_params(request)? {
            subject = subject.iwt_fee(revenue, params);
        }
        Ok(subject)
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn revenue(&self) -> Option<&RevenueAccount> {
        self.revenue.as_ref()
    }
}

impl Transfer for CreditAccount {
    fn owners(&self) -> Vec<Owner> {
        let mut owners = vec![Owner::Account(self.account.clone())];
        if let Some(revenue) = &self.revenue {
            owners.push(Owner::RevenueAccount(revenue.clone()));
        }
        owners
    }

    fn absorb(&mut self, owners: &[Owner]) {
        absorb_account(owners, &mut self.account);
        if let Some(revenue) = &mut self.revenue {
            absorb_revenue(owners, revenue);
        }
    }

    fn book(
        &self,
        request: &mut Request,
        mode: Mode,
        currencies: &dyn CurrencyProvider,
    ) -> ResultEngine<Booking> {
        let (base, _) = request_currencies(currencies, request)?;
        ensure_currency("account", &self.account.currency_code, &base)?;
        let amount = request.required_amount()?;

        let mut booking = Booking::new(mode);
        let account = booking.join(Owner::Account(self.account.clone()));
        let revenue = match &self.revenue {
            Some(revenue) => {
                ensure_currency("revenue account", &revenue.currency_code, &base)?;
                Some(booking.join(Owner::RevenueAccount(revenue.clone())))
            }
            None => None,
        };

        if self.debit_revenue
            && let Some(revenue) = revenue
        {
            let from = booking.debit_wallet(revenue, &base)?;
            booking.push(
                Step::debit(Amount::fixed(base.clone(), amount), from).tag(
                    Leg::new(Purpose::DebitRevenue, revenue, TransactionType::Revenue)
                        .description("debit account"),
                ),
            );
        }

        let to = booking.credit_wallet(account, &base)?;
        booking.push(
            Step::credit(Amount::fixed(base.clone(), amount), to).tag(
                Leg::new(Purpose::CreditAccount, account, TransactionType::Account)
                    .description("credit account"),
            ),
        );

        if let Some(params) = &self.iwt_fee
            && let Some(revenue) = revenue
        {
            let from = booking.debit_wallet(account, &base)?;
            let to = booking.credit_wallet(revenue, &base)?;
            booking
                .push(
                    Step::debit(
                        Amount::transfer_fee(params.clone(), Amount::fixed(base.clone(), amount)),
                        from,
                    )
                    .alias(TRANSFER_FEE)
                    .tag(
                        Leg::new(Purpose::FeeIwt, account, TransactionType::Fee)
                            .description(FEE_DESCRIPTION),
                    ),
                )
                .push(
                    Step::credit(Amount::alias(TRANSFER_FEE), to).tag(
                        Leg::new(Purpose::RevenueIwtTransfer, revenue, TransactionType::Revenue)
                            .description(FEE_DESCRIPTION),
                    ),
                );
        }
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        EngineError, currency::CurrencyBox, details::tests::account, subjects::common::evaluate,
    };

    fn revenue() -> RevenueAccount {
        RevenueAccount {
            id: 3,
            currency_code: "EUR".to_string(),
            balance: Decimal::from(500),
            available_amount: Decimal::from(500),
            is_default: false,
        }
    }

    fn request() -> Request {
        Request::new("u1", "CA", "EUR", "EUR").with_amount(Decimal::from(200))
    }

    #[test]
    fn plain_credit_books_one_leg() {
        let mut subject = CreditAccount::new(account(1, "u1", "EUR"));
        let currencies = CurrencyBox::new().with("EUR", 2);

        let details =
            evaluate(&mut subject, &mut request(), Mode::Evaluate, &currencies).unwrap();

        assert_eq!(details.len(), 1);
        let credit = details.get(&Purpose::CreditAccount).unwrap();
        assert_eq!(credit.amount, Decimal::from(200));
        assert_eq!(credit.transaction.description.as_deref(), Some("credit account"));
        assert_eq!(subject.account().balance, Decimal::from(1200));
        assert_eq!(subject.account().available_amount, Decimal::from(1200));
    }

    #[test]
    fn revenue_funded_credit_with_iwt_fee() {
        let params = TransferFeeParams {
            base: Decimal::from(3),
            ..Default::default()
        };
        let mut subject = CreditAccount::new(account(1, "u1", "EUR"))
            .debit_revenue(revenue())
            .iwt_fee(revenue(), params);
        let currencies = CurrencyBox::new().with("EUR", 2);

        let details =
            evaluate(&mut subject, &mut request(), Mode::Evaluate, &currencies).unwrap();

        let purposes: Vec<_> = details.iter().map(|d| d.purpose.to_string()).collect();
        assert_eq!(
            purposes,
            vec!["debit_revenue", "credit_account", "fee_iwt", "revenue_iwt_transfer_fee"]
        );
        assert_eq!(details.get(&Purpose::FeeIwt).unwrap().amount, Decimal::from(-3));
        assert_eq!(subject.account().balance, Decimal::from(1197));
        assert_eq!(subject.revenue().unwrap().balance, Decimal::from(303));
        let total: Decimal = details.iter().map(|d| d.amount).sum();
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn account_currency_must_be_the_base_currency() {
        let mut subject = CreditAccount::new(account(1, "u1", "USD"));
        let currencies = CurrencyBox::new().with("EUR", 2).with("USD", 2);
        assert!(matches!(
            evaluate(&mut subject, &mut request(), Mode::Evaluate, &currencies),
            Err(EngineError::CurrenciesMismatch(_))
        ));
    }
}
