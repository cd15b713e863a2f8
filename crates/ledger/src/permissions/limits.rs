use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;

use crate::{
    ResultEngine,
    balance::{AggregationItem, AggregationResult, AggregationService},
    limit::{
        DefaultValuesStorage, Identifier, LimitError, LimitService, MAX_CREDIT_PER_TRANSFER,
        MAX_DEBIT_PER_TRANSFER, MAX_TOTAL_BALANCE, SqlStorage, Value,
    },
};

/// How the transfer amounts of a user are combined with history before
/// comparing them to the user's cap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LimitKind {
    /// Current total of the user's accounts plus this transfer's credits.
    MaxTotalBalance,
    /// This transfer's debits only.
    MaxDebitPerTransfer,
    /// This transfer's credits only.
    MaxCreditPerTransfer,
    /// Debits already made within `[from, till]` plus this transfer's debits.
    MaxTotalDebitPerPeriod {
        name: &'static str,
        from: DateTime<Utc>,
        till: DateTime<Utc>,
    },
}

impl LimitKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MaxTotalBalance => MAX_TOTAL_BALANCE,
            Self::MaxDebitPerTransfer => MAX_DEBIT_PER_TRANSFER,
            Self::MaxCreditPerTransfer => MAX_CREDIT_PER_TRANSFER,
            Self::MaxTotalDebitPerPeriod { name, .. } => name,
        }
    }
}

/// A per-user limit check over the amounts one transfer moves.
#[derive(Clone, Debug)]
pub struct LimitCheck {
    kind: LimitKind,
    /// Transfer amounts by user id, as positive magnitudes.
    amounts: BTreeMap<String, AggregationResult>,
    limits: LimitService<DefaultValuesStorage<SqlStorage>>,
    aggregation: AggregationService,
}

impl LimitCheck {
    pub fn new(
        kind: LimitKind,
        amounts: BTreeMap<String, AggregationResult>,
        limits: LimitService<DefaultValuesStorage<SqlStorage>>,
        aggregation: AggregationService,
    ) -> Self {
        Self {
            kind,
            amounts,
            limits,
            aggregation,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub async fn check<C: ConnectionTrait>(&self, db: &C) -> ResultEngine<()> {
        let name = self.name();
        for (user_id, amounts) in &self.amounts {
            let limit = match self
                .limits
                .find_one(db, &Identifier::user(name, user_id))
                .await
            {
                Ok(limit) => limit,
                Err(LimitError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            };
            let Value::Max {
                amount: cap,
                currency_code,
            } = limit.available()
            else {
                continue;
            };

            let mut items = amounts.clone();
            match &self.kind {
                LimitKind::MaxTotalBalance => items.push(
                    self.aggregation
                        .general_total_by_user_id(db, user_id, currency_code)
                        .await?,
                ),
                LimitKind::MaxTotalDebitPerPeriod { from, till, .. } => items.push(
                    self.aggregation
                        .total_debited_by_user_per_period(db, user_id, *from, *till, currency_code)
                        .await?,
                ),
                LimitKind::MaxDebitPerTransfer | LimitKind::MaxCreditPerTransfer => {}
            }
            let total: AggregationItem = self.aggregation.reduce(&items, currency_code)?;

            if let Err(err) = limit.within_limit(total.amount, &total.currency_code) {
                let err = match err {
                    LimitError::LimitExceeded(_) => {
                        let err = LimitError::LimitExceeded(format!(
                            "{name} is exceeded: user with id {user_id} has limit {cap} {currency_code}, but the amount after the transfer would be {} {}",
                            total.amount, total.currency_code
                        ));
                        tracing::info!(
                            limit = name,
                            user_id = %user_id,
                            cap = %cap,
                            total = %total.amount,
                            currency = %currency_code,
                            "limit exceeded"
                        );
                        err
                    }
                    other => other,
                };
                return Err(err.into());
            }
        }
        Ok(())
    }
}
