use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Months, NaiveTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::{
    balance::{AggregationItem, AggregationResult, AggregationService},
    details::Details,
    limit::{
        DefaultValuesStorage, LimitService, MAX_TOTAL_DEBIT_PER_DAY, MAX_TOTAL_DEBIT_PER_MONTH,
        SqlStorage,
    },
    settings::LimitSettings,
};

use super::{LimitCheck, LimitKind, Permission, PermissionCheckers};

/// Builds the permissions a transfer has to pass.
#[derive(Clone, Debug)]
pub struct PermissionFactory {
    settings: LimitSettings,
    limits: LimitService<DefaultValuesStorage<SqlStorage>>,
    aggregation: AggregationService,
}

impl PermissionFactory {
    pub fn new(settings: LimitSettings, aggregation: AggregationService) -> Self {
        let limits = LimitService::new(DefaultValuesStorage::new(SqlStorage, settings.defaults()));
        Self {
            settings,
            limits,
            aggregation,
        }
    }

    /// Permissions for the given details, with period limits evaluated
    /// against the current UTC day and month.
    pub fn create_permission(&self, details: &Details) -> PermissionCheckers {
        self.create_permission_at(details, Utc::now())
    }

    pub fn create_permission_at(&self, details: &Details, now: DateTime<Utc>) -> PermissionCheckers {
        let mut permissions = PermissionCheckers::new();

        for (account, requested) in details.debited_accounts().into_values() {
            permissions
                .push(Permission::account_active(account))
                .push(Permission::withdrawal(account))
                .push(Permission::sufficient_balance(
                    requested,
                    account.available_amount,
                ));
        }
        for (account, _) in details.credited_accounts().into_values() {
            permissions
                .push(Permission::account_active(account))
                .push(Permission::deposit(account));
        }

        let debits = by_user(details.debits_by_user());
        let credits = by_user(details.credits_by_user());
        let (day_from, day_till) = day_window(now);
        let (month_from, month_till) = month_window(now);
        let checks = [
            (LimitKind::MaxTotalBalance, &credits),
            (LimitKind::MaxDebitPerTransfer, &debits),
            (LimitKind::MaxCreditPerTransfer, &credits),
            (
                LimitKind::MaxTotalDebitPerPeriod {
                    name: MAX_TOTAL_DEBIT_PER_DAY,
                    from: day_from,
                    till: day_till,
                },
                &debits,
            ),
            (
                LimitKind::MaxTotalDebitPerPeriod {
                    name: MAX_TOTAL_DEBIT_PER_MONTH,
                    from: month_from,
                    till: month_till,
                },
                &debits,
            ),
        ];
        for (kind, amounts) in checks {
            if !self.settings.is_enabled(kind.name()) {
                continue;
            }
            permissions.push(Permission::Limit(LimitCheck::new(
                kind,
                amounts.clone(),
                self.limits.clone(),
                self.aggregation.clone(),
            )));
        }
        permissions
    }
}

fn by_user(
    amounts: BTreeMap<String, Vec<(String, Decimal)>>,
) -> BTreeMap<String, AggregationResult> {
    amounts
        .into_iter()
        .map(|(user_id, items)| {
            let items = items
                .into_iter()
                .map(|(currency_code, amount)| AggregationItem {
                    amount,
                    currency_code,
                })
                .collect();
            (user_id, items)
        })
        .collect()
}

fn day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + TimeDelta::days(1) - TimeDelta::nanoseconds(1))
}

fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = now.date_naive() - Days::new(u64::from(now.day0()));
    let start = first.and_time(NaiveTime::MIN).and_utc();
    let next = (first + Months::new(1)).and_time(NaiveTime::MIN).and_utc();
    (start, next - TimeDelta::nanoseconds(1))
}
