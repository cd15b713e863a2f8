//! Debiting an account towards outside the platform (`DA`), optionally
//! crediting the same amount to a revenue account.

use sea_orm::ConnectionTrait;

use crate::{
    CurrencyProvider, ResultEngine,
    accounts::Account,
    details::{Owner, Purpose},
    permissions::{Permission, PermissionCheckers},
    requests::Request,
    revenue_accounts::RevenueAccount,
    store,
    transactions::TransactionType,
    transfer::{Amount, Step},
};

use super::{
    common::{
        Booking, Leg, Mode, Transfer, absorb_account, absorb_revenue, ensure_currency,
        request_currencies,
    },
    input,
};

#[derive(Clone, Debug, PartialEq)]
pub struct DebitAccount {
    account: Account,
    revenue: Option<RevenueAccount>,
    allow_negative_balance: bool,
}

impl DebitAccount {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            revenue: None,
            allow_negative_balance: false,
        }
    }

    pub fn credit_revenue(mut self, revenue: RevenueAccount) -> Self {
        self.revenue = Some(revenue);
        self
    }

    pub fn allow_negative_balance(mut self, allow: bool) -> Self {
        self.allow_negative_balance = allow;
        self
    }

    pub(crate) async fn load<C: ConnectionTrait>(db: &C, request: &Request) -> ResultEngine<Self> {
        let account = store::lock_account(db, input::id(request, input::ACCOUNT_ID)?).await?;
        let mut subject = Self::new(account)
            .allow_negative_balance(input::flag(request, input::ALLOW_NEGATIVE_BALANCE)?);
        if input::flag(request, input::CREDIT_TO_REVENUE)? {
            let revenue = input::id(request, input::REVENUE_ACCOUNT_ID)?;
            subject = subject.credit_revenue(store::lock_revenue_account(db, revenue).await?);
        }
        Ok(subject)
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn revenue(&self) -> Option<&RevenueAccount> {
        self.revenue.as_ref()
    }

    /// Withdrawal, and unless negative balances are allowed, enough funds.
    pub fn permissions(&self, request: &Request) -> ResultEngine<PermissionCheckers> {
        let amount = request.required_amount()?;
        let mut permissions = PermissionCheckers::new();
        permissions.push(Permission::withdrawal(&self.account));
        if !self.allow_negative_balance {
            permissions.push(Permission::sufficient_balance(
                amount,
                self.account.available_amount,
            ));
        }
        Ok(permissions)
    }
}

impl Transfer for DebitAccount {
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
        let from = booking.debit_wallet(account, &base)?;
        let mut debit = Leg::new(Purpose::DebitAccount, account, TransactionType::Account);
        if let Some(description) = &request.description {
            debit = debit.description(description.clone());
        }
        booking.push(Step::debit(Amount::fixed(base.clone(), amount), from).tag(debit));

        if let Some(revenue) = &self.revenue {
            ensure_currency("revenue account", &revenue.currency_code, &base)?;
            let revenue = booking.join(Owner::RevenueAccount(revenue.clone()));
            let to = booking.credit_wallet(revenue, &base)?;
            booking.push(
                Step::credit(Amount::fixed(base, amount), to).tag(Leg::new(
                    Purpose::CreditRevenue,
                    revenue,
                    TransactionType::Revenue,
                )),
            );
        }
        Ok(booking)
    }
}
