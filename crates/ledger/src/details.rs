//! In-memory view of an evaluated transfer.
//!
//! Each [`Detail`] joins one leg to a snapshot of its owner taken right after
//! the leg performed. [`Details`] keeps them in evaluation order and refuses a
//! second detail with the same [`Purpose`].

use std::{collections::BTreeMap, str::FromStr};

use rust_decimal::Decimal;

use crate::{
    EngineError, ResultEngine,
    accounts::Account,
    cards::Card,
    revenue_accounts::RevenueAccount,
    transactions::{LegOwner, Transaction},
};

/// Role of a leg within one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Purpose {
    /// `<code>_outgoing`, code being the lowercase subject code.
    Outgoing(String),
    /// `<code>_incoming`.
    Incoming(String),
    /// `revenue_<code>_transfer`.
    RevenueTransfer(String),
    CreditAccount,
    DebitAccount,
    DebitRevenue,
    CreditRevenue,
    FeeExchangeMargin,
    FeeDefaultTransfer,
    FeeIwt,
    RevenueExchangeMargin,
    RevenueIwtTransfer,
}

impl core::fmt::Display for Purpose {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Outgoing(code) => write!(f, "{code}_outgoing"),
            Self::Incoming(code) => write!(f, "{code}_incoming"),
            Self::RevenueTransfer(code) => write!(f, "revenue_{code}_transfer"),
            Self::CreditAccount => f.write_str("credit_account"),
            Self::DebitAccount => f.write_str("debit_account"),
            Self::DebitRevenue => f.write_str("debit_revenue"),
            Self::CreditRevenue => f.write_str("credit_revenue"),
            Self::FeeExchangeMargin => f.write_str("fee_exchange_margin"),
            Self::FeeDefaultTransfer => f.write_str("fee_default_transfer"),
            Self::FeeIwt => f.write_str("fee_iwt"),
            Self::RevenueExchangeMargin => f.write_str("revenue_exchange_margin"),
            Self::RevenueIwtTransfer => f.write_str("revenue_iwt_transfer_fee"),
        }
    }
}

impl FromStr for Purpose {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let fixed = match value {
            "credit_account" => Some(Self::CreditAccount),
            "debit_account" => Some(Self::DebitAccount),
            "debit_revenue" => Some(Self::DebitRevenue),
            "credit_revenue" => Some(Self::CreditRevenue),
            "fee_exchange_margin" => Some(Self::FeeExchangeMargin),
            "fee_default_transfer" => Some(Self::FeeDefaultTransfer),
            "fee_iwt" => Some(Self::FeeIwt),
            "revenue_exchange_margin" => Some(Self::RevenueExchangeMargin),
            "revenue_iwt_transfer_fee" => Some(Self::RevenueIwtTransfer),
            _ => None,
        };
        if let Some(purpose) = fixed {
            return Ok(purpose);
        }
        if let Some(code) = value
            .strip_prefix("revenue_")
            .and_then(|rest| rest.strip_suffix("_transfer"))
            && !code.is_empty()
        {
            return Ok(Self::RevenueTransfer(code.to_string()));
        }
        if let Some(code) = value.strip_suffix("_outgoing")
            && !code.is_empty()
        {
            return Ok(Self::Outgoing(code.to_string()));
        }
        if let Some(code) = value.strip_suffix("_incoming")
            && !code.is_empty()
        {
            return Ok(Self::Incoming(code.to_string()));
        }
        Err(EngineError::KeyNotFound(format!("unknown purpose {value}")))
    }
}

/// Snapshot of the owner a detail was booked against.
#[derive(Clone, Debug, PartialEq)]
pub enum Owner {
    Account(Account),
    Card(Card),
    RevenueAccount(RevenueAccount),
}

impl Owner {
    pub fn leg_owner(&self) -> LegOwner {
        match self {
            Self::Account(account) => LegOwner::Account(account.id),
            Self::Card(card) => LegOwner::Card(card.id),
            Self::RevenueAccount(account) => LegOwner::RevenueAccount(account.id),
        }
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            Self::Account(account) => Some(account),
            _ => None,
        }
    }

    pub fn currency_code(&self) -> &str {
        match self {
            Self::Account(account) => &account.currency_code,
            Self::Card(card) => &card.currency_code,
            Self::RevenueAccount(account) => &account.currency_code,
        }
    }

    /// Settled balance and, except for cards, the available amount.
    pub fn balances(&self) -> (Decimal, Option<Decimal>) {
        match self {
            Self::Account(account) => (account.balance, Some(account.available_amount)),
            Self::Card(card) => (card.balance, None),
            Self::RevenueAccount(account) => (account.balance, Some(account.available_amount)),
        }
    }

    pub fn set_balances(&mut self, balance: Decimal, available: Option<Decimal>) {
        match self {
            Self::Account(account) => {
                account.balance = balance;
                if let Some(available) = available {
                    account.available_amount = available;
                }
            }
            Self::Card(card) => card.balance = balance,
            Self::RevenueAccount(account) => {
                account.balance = balance;
                if let Some(available) = available {
                    account.available_amount = available;
                }
            }
        }
    }

    /// Give back a hold: the available amount grows by `amount`.
    pub(crate) fn release(&mut self, amount: Decimal) {
        match self {
            Self::Account(account) => account.available_amount += amount,
            Self::RevenueAccount(account) => account.available_amount += amount,
            Self::Card(_) => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detail {
    pub purpose: Purpose,
    /// Signed amount: negative for debits.
    pub amount: Decimal,
    pub currency_code: String,
    pub transaction: Transaction,
    pub owner: Owner,
}

impl Detail {
    pub fn is_debit(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn is_credit(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// Details of one evaluation, in the order the legs performed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Details {
    items: Vec<Detail>,
}

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, detail: Detail) -> ResultEngine<()> {
        if self.get(&detail.purpose).is_some() {
            return Err(EngineError::DuplicatePurpose(detail.purpose.to_string()));
        }
        self.items.push(detail);
        Ok(())
    }

    pub fn get(&self, purpose: &Purpose) -> Option<&Detail> {
        self.items.iter().find(|d| &d.purpose == purpose)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detail> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.items.iter().map(|d| &d.transaction)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Detail> {
        self.items.iter_mut()
    }

    /// Accounts touched by debits, each with the summed debit magnitude.
    pub fn debited_accounts(&self) -> BTreeMap<i64, (&Account, Decimal)> {
        self.accounts_by(Detail::is_debit)
    }

    /// Accounts touched by credits, each with the summed credit.
    pub fn credited_accounts(&self) -> BTreeMap<i64, (&Account, Decimal)> {
        self.accounts_by(Detail::is_credit)
    }

    fn accounts_by(&self, filter: fn(&Detail) -> bool) -> BTreeMap<i64, (&Account, Decimal)> {
        let mut out: BTreeMap<i64, (&Account, Decimal)> = BTreeMap::new();
        for detail in self.items.iter().filter(|d| filter(d)) {
            if let Some(account) = detail.owner.account() {
                out.entry(account.id)
                    .and_modify(|(_, total)| *total += detail.amount.abs())
                    .or_insert((account, detail.amount.abs()));
            }
        }
        out
    }

    /// Debits grouped by user, as (currency, magnitude) pairs.
    pub fn debits_by_user(&self) -> BTreeMap<String, Vec<(String, Decimal)>> {
        self.by_user(Detail::is_debit)
    }

    /// Credits grouped by user, as (currency, amount) pairs.
    pub fn credits_by_user(&self) -> BTreeMap<String, Vec<(String, Decimal)>> {
        self.by_user(Detail::is_credit)
    }

    fn by_user(&self, filter: fn(&Detail) -> bool) -> BTreeMap<String, Vec<(String, Decimal)>> {
        let mut out: BTreeMap<String, Vec<(String, Decimal)>> = BTreeMap::new();
        for detail in self.items.iter().filter(|d| filter(d)) {
            if let Some(account) = detail.owner.account() {
                out.entry(account.user_id.clone())
                    .or_default()
                    .push((detail.currency_code.clone(), detail.amount.abs()));
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a Details {
    type Item = &'a Detail;
    type IntoIter = std::slice::Iter<'a, Detail>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
