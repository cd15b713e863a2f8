use rust_decimal::Decimal;

use crate::{Currency, CurrencyAmount, EngineError, ResultEngine};

/// Handle to one linked balance stored in [`Pockets`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PocketId(usize);

/// Arena of linked balances a transfer operates on.
///
/// Owners (accounts, cards, revenue accounts) copy their balances in before
/// a transfer runs and read them back once it succeeded.
#[derive(Clone, Debug, Default)]
pub struct Pockets {
    values: Vec<Decimal>,
}

impl Pockets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: Decimal) -> PocketId {
        self.values.push(value);
        PocketId(self.values.len() - 1)
    }

    pub fn get(&self, id: PocketId) -> ResultEngine<Decimal> {
        self.values
            .get(id.0)
            .copied()
            .ok_or_else(|| EngineError::KeyNotFound(format!("pocket {}", id.0)))
    }

    fn get_mut(&mut self, id: PocketId) -> ResultEngine<&mut Decimal> {
        self.values
            .get_mut(id.0)
            .ok_or_else(|| EngineError::KeyNotFound(format!("pocket {}", id.0)))
    }
}

/// A currency bound to the balance(s) a transfer step moves.
#[derive(Clone, Debug)]
pub enum Wallet {
    /// One linked balance, may go negative.
    Linked { currency: Currency, pocket: PocketId },
    /// Validates like a linked wallet but never moves anything.
    NoOp { currency: Currency },
    /// A capped amount that can only be debited down to zero.
    Consumable { currency: Currency, pocket: PocketId },
    /// Several wallets of the same currency moved together.
    Joined {
        currency: Currency,
        wallets: Vec<Wallet>,
    },
}

impl Wallet {
    pub fn linked(currency: Currency, pocket: PocketId) -> Self {
        Self::Linked { currency, pocket }
    }

    pub fn noop(currency: Currency) -> Self {
        Self::NoOp { currency }
    }

    pub fn consumable(currency: Currency, pocket: PocketId) -> Self {
        Self::Consumable { currency, pocket }
    }

    /// Join wallets so every debit or credit is applied to each of them.
    pub fn join(wallets: Vec<Wallet>) -> ResultEngine<Self> {
        let Some(first) = wallets.first() else {
            return Err(EngineError::InvalidAmount(
                "at least one wallet is required to join".to_string(),
            ));
        };
        let currency = first.currency().clone();
        if let Some(other) = wallets.iter().find(|w| w.currency() != &currency) {
            return Err(EngineError::CurrenciesMismatch(format!(
                "cannot join {} wallet with {} wallet",
                currency.code(),
                other.currency().code()
            )));
        }
        Ok(Self::Joined { currency, wallets })
    }

    pub fn currency(&self) -> &Currency {
        match self {
            Self::Linked { currency, .. }
            | Self::NoOp { currency }
            | Self::Consumable { currency, .. }
            | Self::Joined { currency, .. } => currency,
        }
    }

    /// Current value of the wallet. A join reports its smallest member.
    pub fn amount(&self, pockets: &Pockets) -> ResultEngine<Decimal> {
        match self {
            Self::Linked { pocket, .. } | Self::Consumable { pocket, .. } => pockets.get(*pocket),
            Self::NoOp { .. } => Ok(Decimal::ZERO),
            Self::Joined { wallets, .. } => {
                let mut min: Option<Decimal> = None;
                for wallet in wallets {
                    let value = wallet.amount(pockets)?;
                    min = Some(min.map_or(value, |m| m.min(value)));
                }
                Ok(min.unwrap_or_default())
            }
        }
    }

    pub fn debit(&self, pockets: &mut Pockets, amount: &CurrencyAmount) -> ResultEngine<()> {
        self.validate(amount)?;
        self.check_debit(pockets, amount.amount)?;
        self.apply(pockets, -amount.amount)
    }

    pub fn credit(&self, pockets: &mut Pockets, amount: &CurrencyAmount) -> ResultEngine<()> {
        self.validate(amount)?;
        self.check_credit()?;
        self.apply(pockets, amount.amount)
    }

    fn validate(&self, amount: &CurrencyAmount) -> ResultEngine<()> {
        if amount.currency_code() != self.currency().code() {
            return Err(EngineError::CurrenciesMismatch(format!(
                "wallet currency is {}, amount currency is {}",
                self.currency().code(),
                amount.currency_code()
            )));
        }
        if amount.amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "amount must be positive: got {}",
                amount.amount
            )));
        }
        Ok(())
    }

    fn check_debit(&self, pockets: &Pockets, amount: Decimal) -> ResultEngine<()> {
        match self {
            Self::Consumable { pocket, .. } => {
                let left = pockets.get(*pocket)?;
                if amount > left {
                    return Err(EngineError::NotEnoughFunds(format!(
                        "requested {amount}, only {left} left"
                    )));
                }
                Ok(())
            }
            Self::Joined { wallets, .. } => wallets
                .iter()
                .try_for_each(|wallet| wallet.check_debit(pockets, amount)),
            Self::Linked { .. } | Self::NoOp { .. } => Ok(()),
        }
    }

    fn check_credit(&self) -> ResultEngine<()> {
        match self {
            Self::Consumable { currency, .. } => Err(EngineError::InvalidAmount(format!(
                "consumable {} amount cannot be credited",
                currency.code()
            ))),
            Self::Joined { wallets, .. } => wallets.iter().try_for_each(Wallet::check_credit),
            Self::Linked { .. } | Self::NoOp { .. } => Ok(()),
        }
    }

    fn apply(&self, pockets: &mut Pockets, delta: Decimal) -> ResultEngine<()> {
        match self {
            Self::Linked { pocket, .. } | Self::Consumable { pocket, .. } => {
                *pockets.get_mut(*pocket)? += delta;
                Ok(())
            }
            Self::NoOp { .. } => Ok(()),
            Self::Joined { wallets, .. } => wallets
                .iter()
                .try_for_each(|wallet| wallet.apply(pockets, delta)),
        }
    }
}
