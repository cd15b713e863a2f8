//! Rules admitting or rejecting a transfer.
//!
//! A [`PermissionCheckers`] list is built per request by the
//! [`PermissionFactory`] from the details of a dry run. Checks run in order
//! and the first failure is returned unchanged.

use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;

use crate::{EngineError, ResultEngine, accounts::Account};

mod factory;
mod limits;

pub use factory::PermissionFactory;
pub use limits::{LimitCheck, LimitKind};

pub const ACCOUNT_ACTIVE: &str = "account_active";
pub const WITHDRAWAL_ALLOWED: &str = "withdrawal_allowed";
pub const DEPOSIT_ALLOWED: &str = "deposit_allowed";
pub const SUFFICIENT_BALANCE: &str = "sufficient_balance";
pub const COMBINED_PERMISSIONS: &str = "combined_permissions";

#[derive(Clone, Debug)]
pub enum Permission {
    AccountActive {
        account_id: i64,
        is_active: Option<bool>,
    },
    Withdrawal {
        account_id: i64,
        allowed: Option<bool>,
    },
    Deposit {
        account_id: i64,
        allowed: Option<bool>,
    },
    /// Compares magnitudes: `requested` must not exceed `available`.
    SufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
    Limit(LimitCheck),
}

impl Permission {
    pub fn account_active(account: &Account) -> Self {
        Self::AccountActive {
            account_id: account.id,
            is_active: account.is_active,
        }
    }

    pub fn withdrawal(account: &Account) -> Self {
        Self::Withdrawal {
            account_id: account.id,
            allowed: account.allow_withdrawals,
        }
    }

    pub fn deposit(account: &Account) -> Self {
        Self::Deposit {
            account_id: account.id,
            allowed: account.allow_deposits,
        }
    }

    pub fn sufficient_balance(requested: Decimal, available: Decimal) -> Self {
        Self::SufficientBalance {
            requested,
            available,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AccountActive { .. } => ACCOUNT_ACTIVE,
            Self::Withdrawal { .. } => WITHDRAWAL_ALLOWED,
            Self::Deposit { .. } => DEPOSIT_ALLOWED,
            Self::SufficientBalance { .. } => SUFFICIENT_BALANCE,
            Self::Limit(check) => check.name(),
        }
    }

    /// Run the check. Limit checks read limits and history through `db`.
    pub async fn check<C: ConnectionTrait>(&self, db: &C) -> ResultEngine<()> {
        match self {
            Self::AccountActive {
                account_id,
                is_active,
            } => flag(*is_active, *account_id, "is_active", EngineError::AccountInactive),
            Self::Withdrawal {
                account_id,
                allowed,
            } => flag(
                *allowed,
                *account_id,
                "allow_withdrawals",
                EngineError::WithdrawalNotAllowed,
            ),
            Self::Deposit {
                account_id,
                allowed,
            } => flag(
                *allowed,
                *account_id,
                "allow_deposits",
                EngineError::DepositNotAllowed,
            ),
            Self::SufficientBalance {
                requested,
                available,
            } => {
                if requested > available {
                    return Err(EngineError::InsufficientBalance(format!(
                        "requested amount \"{requested}\" is greater than available amount \"{available}\""
                    )));
                }
                Ok(())
            }
            Self::Limit(check) => check.check(db).await,
        }
    }
}

/// A flag that is unset does not permit anything.
fn flag(
    value: Option<bool>,
    account_id: i64,
    property: &str,
    error: fn(String) -> EngineError,
) -> ResultEngine<()> {
    match value {
        Some(true) => Ok(()),
        Some(false) => Err(error(format!("account #{account_id}"))),
        None => Err(error(format!(
            "account #{account_id}, property '{property}' is not set"
        ))),
    }
}

/// Ordered conjunction of permissions.
#[derive(Clone, Debug, Default)]
pub struct PermissionCheckers {
    permissions: Vec<Permission>,
}

impl PermissionCheckers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, permission: Permission) -> &mut Self {
        self.permissions.push(permission);
        self
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    pub fn name(&self) -> &'static str {
        COMBINED_PERMISSIONS
    }

    /// Check the permissions one by one, stopping on the first failure.
    pub async fn check<C: ConnectionTrait>(&self, db: &C) -> ResultEngine<()> {
        for permission in &self.permissions {
            permission.check(db).await?;
        }
        Ok(())
    }
}

impl FromIterator<Permission> for PermissionCheckers {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{Database, DatabaseConnection};

    use super::*;
    use crate::details::tests::account;

    async fn db() -> DatabaseConnection {
        Database::connect("sqlite::memory:").await.unwrap()
    }

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[tokio::test]
    async fn unset_flags_fail_closed() {
        let db = db().await;
        let mut source = account(7, "u1", "EUR");
        source.allow_withdrawals = None;
        source.allow_deposits = Some(false);
        source.is_active = None;

        let withdrawal = Permission::withdrawal(&source).check(&db).await;
        assert!(matches!(withdrawal, Err(EngineError::WithdrawalNotAllowed(msg)) if msg.contains("not set")));
        assert!(matches!(
            Permission::deposit(&source).check(&db).await,
            Err(EngineError::DepositNotAllowed(_))
        ));
        assert!(matches!(
            Permission::account_active(&source).check(&db).await,
            Err(EngineError::AccountInactive(_))
        ));
    }

    #[tokio::test]
    async fn sufficient_balance_compares_amounts() {
        let db = db().await;
        assert_eq!(
            Permission::sufficient_balance(dec("100"), dec("100"))
                .check(&db)
                .await,
            Ok(())
        );
        assert!(matches!(
            Permission::sufficient_balance(dec("100.01"), dec("100"))
                .check(&db)
                .await,
            Err(EngineError::InsufficientBalance(_))
        ));
    }

    #[tokio::test]
    async fn combined_checks_stop_at_first_failure() {
        let db = db().await;
        let mut blocked = account(1, "u1", "EUR");
        blocked.allow_withdrawals = Some(false);
        let checkers: PermissionCheckers = [
            Permission::account_active(&blocked),
            Permission::withdrawal(&blocked),
            Permission::sufficient_balance(dec("5000"), dec("1")),
        ]
        .into_iter()
        .collect();

        assert_eq!(checkers.name(), "combined_permissions");
        assert_eq!(checkers.len(), 3);
        assert_eq!(
            checkers.check(&db).await,
            Err(EngineError::WithdrawalNotAllowed("account #1".to_string()))
        );
        assert_eq!(PermissionCheckers::new().check(&db).await, Ok(()));
    }
}
