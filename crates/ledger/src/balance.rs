//! Currency-normalized sums over a user's accounts and ledger history.
//!
//! Limit checks use these totals to compare what a transfer would do against
//! what already happened.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::{
    ResultEngine, account_types, accounts,
    exchange::{CachedRateSource, RateSource},
    transactions::{self, TransactionStatus},
    util::parse_decimal,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregationItem {
    pub amount: Decimal,
    pub currency_code: String,
}

impl AggregationItem {
    pub fn new(amount: Decimal, currency_code: &str) -> Self {
        Self {
            amount,
            currency_code: currency_code.to_string(),
        }
    }
}

/// Per-currency partial sums.
pub type AggregationResult = Vec<AggregationItem>;

#[derive(Clone)]
pub struct AggregationService {
    rates: Arc<dyn RateSource>,
}

impl core::fmt::Debug for AggregationService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AggregationService").finish_non_exhaustive()
    }
}

impl AggregationService {
    pub fn new(rates: Arc<dyn RateSource>) -> Self {
        Self { rates }
    }

    /// Total of every account the user owns: available amounts plus the
    /// magnitude of the user's pending legs, expressed in `currency_code`.
    pub async fn general_total_by_user_id<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        currency_code: &str,
    ) -> ResultEngine<AggregationItem> {
        let accounts = user_accounts(db, user_id).await?;
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for (account, currency) in accounts.values() {
            *totals.entry(currency.clone()).or_default() +=
                parse_decimal(&account.available_amount, "available amount")?;
        }

        let pending = transactions::Entity::find()
            .filter(transactions::Column::AccountId.is_in(accounts.keys().copied()))
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
            .all(db)
            .await?;
        for leg in pending {
            if let Some((_, currency)) = leg.account_id.and_then(|id| accounts.get(&id)) {
                *totals.entry(currency.clone()).or_default() +=
                    parse_decimal(&leg.amount, "transaction amount")?.abs();
            }
        }

        self.reduce(&into_result(totals), currency_code)
    }

    /// Magnitude of the user's pending or executed debit legs created
    /// within `[from, till]`, expressed in `currency_code`.
    pub async fn total_debited_by_user_per_period<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        from: DateTime<Utc>,
        till: DateTime<Utc>,
        currency_code: &str,
    ) -> ResultEngine<AggregationItem> {
        let accounts = user_accounts(db, user_id).await?;
        let legs = transactions::Entity::find()
            .filter(transactions::Column::AccountId.is_in(accounts.keys().copied()))
            .filter(transactions::Column::Status.is_in([
                TransactionStatus::Pending.as_str(),
                TransactionStatus::Executed.as_str(),
            ]))
            .filter(transactions::Column::CreatedAt.between(from, till))
            .all(db)
            .await?;

        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for leg in legs {
            let amount = parse_decimal(&leg.amount, "transaction amount")?;
            if amount >= Decimal::ZERO {
                continue;
            }
            if let Some((_, currency)) = leg.account_id.and_then(|id| accounts.get(&id)) {
                *totals.entry(currency.clone()).or_default() += amount.abs();
            }
        }

        self.reduce(&into_result(totals), currency_code)
    }

    /// Sum the items after converting each into `currency_code`.
    pub fn reduce(&self, items: &[AggregationItem], currency_code: &str) -> ResultEngine<AggregationItem> {
        let rates = CachedRateSource::new(Arc::clone(&self.rates));
        let mut total = Decimal::ZERO;
        for item in items {
            if item.currency_code == currency_code {
                total += item.amount;
                continue;
            }
            let rate = rates.find_rate(&item.currency_code, currency_code)?;
            total += item.amount * rate.rate;
        }
        Ok(AggregationItem::new(total, currency_code))
    }
}

fn into_result(totals: BTreeMap<String, Decimal>) -> AggregationResult {
    totals
        .into_iter()
        .map(|(currency_code, amount)| AggregationItem {
            amount,
            currency_code,
        })
        .collect()
}

/// The user's accounts by id, each with its currency.
async fn user_accounts<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> ResultEngine<BTreeMap<i64, (accounts::Model, String)>> {
    let rows = accounts::Entity::find()
        .filter(accounts::Column::UserId.eq(user_id))
        .find_also_related(account_types::Entity)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(account, account_type)| {
            account_type.map(|t| (account.id, (account, t.currency_code)))
        })
        .collect())
}
