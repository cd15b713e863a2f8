//! Card funding: money leaves an account and lands on a card (`CFT`).

use sea_orm::ConnectionTrait;

use crate::{
    CurrencyProvider, ResultEngine,
    accounts::Account,
    cards::Card,
    details::Owner,
    requests::Request,
    revenue_accounts::RevenueAccount,
    store,
    transactions::TransactionType,
};

use super::{
    ba::{Funding, book_funding},
    common::{Booking, Mode, Transfer, absorb_account, absorb_card, absorb_revenue},
    input,
};

const CODE: &str = "cft";
const DEFAULT_DESCRIPTION: &str = "Card Funding Transfer";

#[derive(Clone, Debug, PartialEq)]
pub struct CardFunding {
    source: Account,
    destination: Card,
    revenue: RevenueAccount,
}

impl CardFunding {
    pub fn new(source: Account, destination: Card, revenue: RevenueAccount) -> Self {
        Self {
            source,
            destination,
            revenue,
        }
    }

    pub(crate) async fn load<C: ConnectionTrait>(db: &C, request: &Request) -> ResultEngine<Self> {
        let source = input::id(request, input::SOURCE_ACCOUNT_ID)?;
        let card = input::id(request, input::DESTINATION_CARD_ID)?;
        let revenue = input::id(request, input::REVENUE_ACCOUNT_ID)?;
        Ok(Self::new(
            store::lock_account(db, source).await?,
            store::lock_card(db, card).await?,
            store::lock_revenue_account(db, revenue).await?,
        ))
    }

    pub fn source(&self) -> &Account {
        &self.source
    }

    pub fn destination(&self) -> &Card {
        &self.destination
    }

    pub fn revenue(&self) -> &RevenueAccount {
        &self.revenue
    }
}

impl Transfer for CardFunding {
    fn owners(&self) -> Vec<Owner> {
        vec![
            Owner::Account(self.source.clone()),
            Owner::Card(self.destination.clone()),
            Owner::RevenueAccount(self.revenue.clone()),
        ]
    }

    fn absorb(&mut self, owners: &[Owner]) {
        absorb_account(owners, &mut self.source);
        absorb_card(owners, &mut self.destination);
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
                code: CODE,
                source: &self.source,
                destination: Owner::Card(self.destination.clone()),
                incoming: TransactionType::Card,
                revenue: &self.revenue,
                default_description: DEFAULT_DESCRIPTION,
            },
            request,
            mode,
            currencies,
        )
    }
}
