//! Debiting a revenue account (`DRA`).

use sea_orm::ConnectionTrait;

use crate::{
    CurrencyProvider, ResultEngine,
    details::{Owner, Purpose},
    requests::Request,
    revenue_accounts::RevenueAccount,
    store,
    transactions::TransactionType,
    transfer::{Amount, Step},
};

use super::{
    common::{Booking, Leg, Mode, Transfer, absorb_revenue, ensure_currency, request_currencies},
    input,
};

#[derive(Clone, Debug, PartialEq)]
pub struct DebitRevenue {
    revenue: RevenueAccount,
}

impl DebitRevenue {
    pub fn new(revenue: RevenueAccount) -> Self {
        Self { revenue }
    }

    pub(crate) async fn load<C: ConnectionTrait>(db: &C, request: &Request) -> ResultEngine<Self> {
        let id = input::id(request, input::REVENUE_ACCOUNT_ID)?;
        Ok(Self::new(store::lock_revenue_account(db, id).await?))
    }

    pub fn revenue(&self) -> &RevenueAccount {
        &self.revenue
    }
}

impl Transfer for DebitRevenue {
    fn owners(&self) -> Vec<Owner> {
        vec![Owner::RevenueAccount(self.revenue.clone())]
    }

    fn absorb(&mut self, owners: &[Owner]) {
        absorb_revenue(owners, &mut self.revenue);
    }

    fn book(
        &self,
        request: &mut Request,
        mode: Mode,
        currencies: &dyn CurrencyProvider,
    ) -> ResultEngine<Booking> {
        let (base, _) = request_currencies(currencies, request)?;
        ensure_currency("revenue account", &self.revenue.currency_code, &base)?;
        let amount = request.required_amount()?;

        let mut booking = Booking::new(mode);
        let revenue = booking.join(Owner::RevenueAccount(self.revenue.clone()));
        let from = booking.debit_wallet(revenue, &base)?;
        let mut leg = Leg::new(Purpose::DebitRevenue, revenue, TransactionType::Revenue);
        if let Some(description) = &request.description {
            leg = leg.description(description.clone());
        }
        booking.push(Step::debit(Amount::fixed(base, amount), from).tag(leg));
        Ok(booking)
    }
}
