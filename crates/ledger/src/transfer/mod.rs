//! Transfer builder.
//!
//! A transfer is an ordered [`Chain`] of debit, credit and exchange
//! [`Step`]s over [`Wallet`]s. Wallets do not own money: they point at
//! linked balances kept in a [`Pockets`] arena, so the same balance can be
//! moved through different wallets (balance only, available amount only,
//! both joined, or nothing at all for a dry run).
//!
//! Steps may name their realized amount (`alias`) for later steps and may
//! join a named group whose signed sum is readable from the callback while
//! the chain runs.

mod amount;
mod chain;
mod fee;
mod wallet;

pub use amount::Amount;
pub use chain::{ActionKind, Chain, Groups, Performed, Step};
pub use fee::{TransferFeeParams, margin_multiplier};
pub use wallet::{PocketId, Pockets, Wallet};
