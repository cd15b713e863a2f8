//! Transfer subjects.
//!
//! Each kind of request is one [`Subject`] variant. Two-phase subjects
//! (transfers between accounts, card funding and outgoing wires) can be held
//! as pending, modified, cancelled or executed; the others execute in one
//! step straight from `new`.
//!
//! Lifecycle operations run on the caller's open database transaction and
//! leave committing to it.

mod ba;
mod ca;
mod cft;
mod common;
mod da;
mod dra;
pub(crate) mod input;
mod owt;

use sea_orm::{ConnectionTrait, DatabaseTransaction};

use crate::{
    CurrencyProvider, EngineError, ResultEngine,
    details::{Details, Owner},
    permissions::{PermissionCheckers, PermissionFactory},
    requests::Request,
};

pub use ba::BetweenAccounts;
pub use ca::CreditAccount;
pub use cft::CardFunding;
pub use common::Mode;
pub use da::DebitAccount;
pub use dra::DebitRevenue;
pub use owt::OutgoingWire;

use common::{Transfer, not_supported};

/// What lifecycle operations need besides the database.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub currencies: &'a dyn CurrencyProvider,
    pub permissions: &'a PermissionFactory,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Subject {
    /// `TBA` and `TBU`.
    Ba(BetweenAccounts),
    Owt(OutgoingWire),
    Cft(CardFunding),
    Ca(CreditAccount),
    Da(DebitAccount),
    Dra(DebitRevenue),
}

macro_rules! dispatch {
    ($subject:expr, $inner:ident => $body:expr) => {
        match $subject {
            Subject::Ba($inner) => $body,
            Subject::Owt($inner) => $body,
            Subject::Cft($inner) => $body,
            Subject::Ca($inner) => $body,
            Subject::Da($inner) => $body,
            Subject::Dra($inner) => $body,
        }
    };
}

impl Subject {
    /// Load the owners named by the request input, locking their rows.
    pub async fn load<C: ConnectionTrait>(db: &C, request: &Request) -> ResultEngine<Self> {
        let subject = match request.subject.to_ascii_uppercase().as_str() {
            "TBA" | "TBU" => Self::Ba(BetweenAccounts::load(db, request).await?),
            "OWT" => Self::Owt(OutgoingWire::load(db, request).await?),
            "CFT" => Self::Cft(CardFunding::load(db, request).await?),
            "CA" => Self::Ca(CreditAccount::load(db, request).await?),
            "DA" => Self::Da(DebitAccount::load(db, request).await?),
            "DRA" => Self::Dra(DebitRevenue::load(db, request).await?),
            other => {
                return Err(EngineError::SubjectNotSupported(format!(
                    "subject \"{other}\" is not supported"
                )));
            }
        };
        Ok(subject)
    }

    /// Owners with their current in-memory balances.
    pub fn owners(&self) -> Vec<Owner> {
        dispatch!(self, subject => subject.owners())
    }

    /// Compute the legs and move the in-memory balances. Nothing is stored.
    pub fn evaluate(
        &mut self,
        request: &mut Request,
        currencies: &dyn CurrencyProvider,
    ) -> ResultEngine<Details> {
        dispatch!(self, subject => common::evaluate(subject, request, Mode::Evaluate, currencies))
    }

    /// Compute the legs without moving any balance.
    pub fn dry_run(
        &self,
        request: &mut Request,
        currencies: &dyn CurrencyProvider,
    ) -> ResultEngine<Details> {
        dispatch!(self, subject => common::dry_run(subject, request, currencies))
    }

    /// Hold the debited amounts and store the legs as pending.
    pub async fn pending(
        &mut self,
        db: &DatabaseTransaction,
        request: &mut Request,
        ctx: &Context<'_>,
    ) -> ResultEngine<Details> {
        match self {
            Self::Ba(subject) => common::pending(subject, db, request, ctx).await,
            Self::Owt(subject) => common::pending(subject, db, request, ctx).await,
            Self::Cft(subject) => common::pending(subject, db, request, ctx).await,
            Self::Ca(_) | Self::Da(_) | Self::Dra(_) => {
                Err(not_supported("pending", &request.subject))
            }
        }
    }

    pub async fn execute(
        &mut self,
        db: &DatabaseTransaction,
        request: &mut Request,
        ctx: &Context<'_>,
    ) -> ResultEngine<Details> {
        match self {
            Self::Ba(subject) => common::execute(subject, db, request, ctx).await,
            Self::Owt(subject) => common::execute(subject, db, request, ctx).await,
            Self::Cft(subject) => common::execute(subject, db, request, ctx).await,
            Self::Ca(subject) => {
                common::execute_once(subject, db, request, ctx, PermissionCheckers::new()).await
            }
            Self::Da(subject) => {
                let permissions = subject.permissions(request)?;
                common::execute_once(subject, db, request, ctx, permissions).await
            }
            Self::Dra(subject) => {
                common::execute_once(subject, db, request, ctx, PermissionCheckers::new()).await
            }
        }
    }

    /// Recompute a pending request in place after its amount or rate changed.
    pub async fn modify(
        &mut self,
        db: &DatabaseTransaction,
        request: &mut Request,
        ctx: &Context<'_>,
    ) -> ResultEngine<Details> {
        match self {
            Self::Ba(subject) => common::modify(subject, db, request, ctx).await,
            Self::Owt(subject) => common::modify(subject, db, request, ctx).await,
            Self::Cft(subject) => common::modify(subject, db, request, ctx).await,
            Self::Ca(_) | Self::Da(_) | Self::Dra(_) => {
                Err(not_supported("modify", &request.subject))
            }
        }
    }

    /// Release the holds of a pending request.
    pub async fn cancel(
        &mut self,
        db: &DatabaseTransaction,
        request: &mut Request,
        reason: &str,
    ) -> ResultEngine<()> {
        match self {
            Self::Ba(subject) => common::cancel(subject, db, request, reason).await,
            Self::Owt(subject) => common::cancel(subject, db, request, reason).await,
            Self::Cft(subject) => common::cancel(subject, db, request, reason).await,
            Self::Ca(_) | Self::Da(_) | Self::Dra(_) => {
                Err(not_supported("cancel", &request.subject))
            }
        }
    }
}
