//! Booking machinery and lifecycle steps shared by the transfer subjects.
//!
//! A subject lays out its legs as a [`Booking`]: the owners it moves money
//! between plus a tagged [`Chain`]. The [`Mode`] decides which balances the
//! wallets are bound to, so one layout serves evaluation, dry runs, holds
//! and settlement alike.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::DatabaseTransaction;

use crate::{
    Currency, CurrencyProvider, EngineError, ResultEngine,
    accounts::Account,
    cards::Card,
    details::{Detail, Details, Owner, Purpose},
    exchange::{DirectRateSource, Rate, RateSource, ReverseRateSource},
    permissions::PermissionCheckers,
    requests::{Request, RequestStatus},
    revenue_accounts::RevenueAccount,
    store,
    transactions::{Transaction, TransactionStatus, TransactionType},
    transfer::{Chain, PocketId, Pockets, Step, Wallet},
};

use super::Context;

pub(crate) const SHOW_AMOUNT: &str = "showAmount";
pub(crate) const EXCHANGE_MARGIN: &str = "exchangeMargin";
pub(crate) const TRANSFER_FEE: &str = "transferFee";
pub(crate) const DESTINATION_AMOUNT: &str = "destinationAmount";

/// Which balances a booking moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Settled balance and available amount together.
    Evaluate,
    /// Nothing moves; legs and amounts are still computed.
    DryRun,
    /// Debits reserve the available amount, credits wait.
    Hold,
    /// Debits leave the settled balance, credits land in full.
    Settle,
}

/// Index of an owner within a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Party(usize);

#[derive(Debug)]
struct Participant {
    owner: Owner,
    balance: PocketId,
    /// None for cards.
    available: Option<PocketId>,
}

/// Tag attached to every chain step that becomes a transaction.
#[derive(Clone, Debug)]
pub(crate) struct Leg {
    purpose: Purpose,
    party: Party,
    kind: TransactionType,
    description: Option<String>,
    visible: bool,
    show_group: Option<&'static str>,
    skip_zero: bool,
}

impl Leg {
    pub fn new(purpose: Purpose, party: Party, kind: TransactionType) -> Self {
        Self {
            purpose,
            party,
            kind,
            description: None,
            visible: true,
            show_group: None,
            skip_zero: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Report the group sum as the shown amount when it differs from the leg.
    pub fn show_group(mut self, group: &'static str) -> Self {
        self.show_group = Some(group);
        self
    }

    /// Drop the leg when it realizes to zero.
    pub fn skip_zero(mut self) -> Self {
        self.skip_zero = true;
        self
    }
}

/// Result of running a booking.
#[derive(Debug)]
pub(crate) struct Booked {
    pub details: Details,
    /// Every owner of the booking with its recomputed balances.
    pub owners: Vec<Owner>,
}

/// Owners, pockets and the tagged chain of one evaluation.
#[derive(Debug)]
pub(crate) struct Booking {
    mode: Mode,
    pockets: Pockets,
    participants: Vec<Participant>,
    chain: Chain<Leg>,
}

impl Booking {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            pockets: Pockets::new(),
            participants: Vec::new(),
            chain: Chain::new(),
        }
    }

    pub fn join(&mut self, owner: Owner) -> Party {
        let (balance, available) = owner.balances();
        let balance = self.pockets.add(balance);
        let available = available.map(|value| self.pockets.add(value));
        self.participants.push(Participant {
            owner,
            balance,
            available,
        });
        Party(self.participants.len() - 1)
    }

    /// A free-standing pocket, e.g. the remainder a transfer consumes.
    pub fn pocket(&mut self, value: Decimal) -> PocketId {
        self.pockets.add(value)
    }

    fn participant(&self, party: Party) -> ResultEngine<&Participant> {
        self.participants
            .get(party.0)
            .ok_or_else(|| EngineError::KeyNotFound(format!("booking party #{}", party.0)))
    }

    fn full_wallet(&self, party: Party, currency: &Currency) -> ResultEngine<Wallet> {
        let participant = self.participant(party)?;
        let balance = Wallet::linked(currency.clone(), participant.balance);
        match participant.available {
            Some(available) => {
                Wallet::join(vec![balance, Wallet::linked(currency.clone(), available)])
            }
            None => Ok(balance),
        }
    }

    pub fn debit_wallet(&self, party: Party, currency: &Currency) -> ResultEngine<Wallet> {
        match self.mode {
            Mode::Evaluate => self.full_wallet(party, currency),
            Mode::DryRun => Ok(Wallet::noop(currency.clone())),
            Mode::Hold => {
                let participant = self.participant(party)?;
                let pocket = participant.available.unwrap_or(participant.balance);
                Ok(Wallet::linked(currency.clone(), pocket))
            }
            Mode::Settle => Ok(Wallet::linked(currency.clone(), self.participant(party)?.balance)),
        }
    }

    pub fn credit_wallet(&self, party: Party, currency: &Currency) -> ResultEngine<Wallet> {
        match self.mode {
            Mode::Evaluate | Mode::Settle => self.full_wallet(party, currency),
            Mode::DryRun | Mode::Hold => Ok(Wallet::noop(currency.clone())),
        }
    }

    pub fn push(&mut self, step: Step<Leg>) -> &mut Self {
        self.chain.push(step);
        self
    }

    /// Run the chain, turning every tagged step into a detail.
    pub fn run(self, request_id: i64) -> ResultEngine<Booked> {
        let Self {
            mut pockets,
            mut participants,
            chain,
            ..
        } = self;
        let created_at = Utc::now();
        let mut details = Details::new();

        chain.execute(&mut pockets, |performed| {
            let amount = performed.signed_amount();
            let Some(leg) = performed.tag else {
                return Ok(());
            };
            if leg.skip_zero && amount.is_zero() {
                return Ok(());
            }
            let participant = participants.get_mut(leg.party.0).ok_or_else(|| {
                EngineError::KeyNotFound(format!("booking party #{}", leg.party.0))
            })?;
            let balance = performed.pockets.get(participant.balance)?;
            let available = participant
                .available
                .map(|pocket| performed.pockets.get(pocket))
                .transpose()?;
            participant.owner.set_balances(balance, available);

            let show_amount = leg
                .show_group
                .map(|group| performed.groups.sum(group))
                .filter(|sum| *sum != amount);
            let transaction = Transaction {
                id: 0,
                request_id,
                owner: participant.owner.leg_owner(),
                status: None,
                description: leg.description,
                amount,
                show_amount,
                available_balance_snapshot: Some(available.unwrap_or(balance)),
                show_available_balance_snapshot: None,
                current_balance_snapshot: Some(balance),
                show_current_balance_snapshot: None,
                is_visible: leg.visible,
                kind: leg.kind,
                purpose: leg.purpose.clone(),
                created_at,
            };
            details.insert(Detail {
                purpose: leg.purpose,
                amount,
                currency_code: performed.amount.currency_code().to_string(),
                transaction,
                owner: participant.owner.clone(),
            })
        })?;

        let mut owners = Vec::with_capacity(participants.len());
        for mut participant in participants {
            let balance = pockets.get(participant.balance)?;
            let available = participant
                .available
                .map(|pocket| pockets.get(pocket))
                .transpose()?;
            participant.owner.set_balances(balance, available);
            owners.push(participant.owner);
        }
        Ok(Booked { details, owners })
    }
}

/// One transfer subject as seen by the shared lifecycle.
pub(crate) trait Transfer {
    /// Whether evaluation derives `request.amount`, which then has to be
    /// persisted with the status.
    const DERIVES_AMOUNT: bool = false;

    /// Owners as currently loaded.
    fn owners(&self) -> Vec<Owner>;

    /// Take over recomputed balances.
    fn absorb(&mut self, owners: &[Owner]);

    /// Lay out the legs of the request for the given mode.
    fn book(
        &self,
        request: &mut Request,
        mode: Mode,
        currencies: &dyn CurrencyProvider,
    ) -> ResultEngine<Booking>;
}

pub(crate) fn evaluate<S: Transfer>(
    subject: &mut S,
    request: &mut Request,
    mode: Mode,
    currencies: &dyn CurrencyProvider,
) -> ResultEngine<Details> {
    let booked = subject.book(request, mode, currencies)?.run(request.id)?;
    subject.absorb(&booked.owners);
    Ok(booked.details)
}

pub(crate) fn dry_run<S: Transfer>(
    subject: &S,
    request: &mut Request,
    currencies: &dyn CurrencyProvider,
) -> ResultEngine<Details> {
    Ok(subject
        .book(request, Mode::DryRun, currencies)?
        .run(request.id)?
        .details)
}

async fn finish<S: Transfer>(
    db: &DatabaseTransaction,
    request: &mut Request,
    status: RequestStatus,
) -> ResultEngine<()> {
    if S::DERIVES_AMOUNT {
        store::update_request_status_and_amount(db, request, status).await
    } else {
        store::update_request_status(db, request, status).await
    }
}

/// Dry run the request and check the permissions its legs call for.
async fn authorize<S: Transfer>(
    subject: &S,
    db: &DatabaseTransaction,
    request: &mut Request,
    ctx: &Context<'_>,
) -> ResultEngine<()> {
    let preview = dry_run(subject, request, ctx.currencies)?;
    ctx.permissions.create_permission(&preview).check(db).await
}

pub(crate) async fn pending<S: Transfer>(
    subject: &mut S,
    db: &DatabaseTransaction,
    request: &mut Request,
    ctx: &Context<'_>,
) -> ResultEngine<Details> {
    if request.status != RequestStatus::New {
        return Err(EngineError::UnexpectedStatus(format!(
            "expected status new, but got {}",
            request.status
        )));
    }
    authorize(subject, db, request, ctx).await?;

    let mut details = evaluate(subject, request, Mode::Hold, ctx.currencies)?;
    store::save_transactions(db, &mut details, TransactionStatus::Pending).await?;
    store::update_owners(db, &subject.owners()).await?;
    finish::<S>(db, request, RequestStatus::Pending).await?;
    tracing::debug!(request_id = request.id, legs = details.len(), "request held");
    Ok(details)
}

pub(crate) async fn execute<S: Transfer>(
    subject: &mut S,
    db: &DatabaseTransaction,
    request: &mut Request,
    ctx: &Context<'_>,
) -> ResultEngine<Details> {
    let details = match request.status {
        RequestStatus::New => {
            authorize(subject, db, request, ctx).await?;
            let mut details = evaluate(subject, request, Mode::Evaluate, ctx.currencies)?;
            store::save_transactions(db, &mut details, TransactionStatus::Executed).await?;
            details
        }
        RequestStatus::Pending => {
            let legs = store::load_transactions(db, request.id).await?;
            let mut details = evaluate(subject, request, Mode::Settle, ctx.currencies)?;
            store::sync_transactions(db, &mut details, &legs, TransactionStatus::Executed)
                .await?;
            details
        }
        other => {
            return Err(EngineError::UnexpectedStatus(format!(
                "request could be executed from status \"new\" or \"pending\": got \"{other}\" status"
            )));
        }
    };
    store::update_owners(db, &subject.owners()).await?;
    finish::<S>(db, request, RequestStatus::Executed).await?;
    tracing::debug!(request_id = request.id, legs = details.len(), "request executed");
    Ok(details)
}

fn ensure_pending(request: &Request, action: &str) -> ResultEngine<()> {
    if request.status != RequestStatus::Pending {
        return Err(EngineError::UnexpectedStatus(format!(
            "only requests with status \"pending\" could be {action}: got \"{}\" status",
            request.status
        )));
    }
    Ok(())
}

/// Owners of the subject with the holds of the given legs given back.
fn released<S: Transfer>(subject: &mut S, legs: &[Transaction]) -> Vec<Owner> {
    let mut owners = subject.owners();
    store::release_holds(&mut owners, legs);
    subject.absorb(&owners);
    owners
}

pub(crate) async fn modify<S: Transfer>(
    subject: &mut S,
    db: &DatabaseTransaction,
    request: &mut Request,
    ctx: &Context<'_>,
) -> ResultEngine<Details> {
    ensure_pending(request, "modified")?;
    let legs = store::load_transactions(db, request.id).await?;
    released(subject, &legs);

    let mut details = evaluate(subject, request, Mode::Hold, ctx.currencies)?;
    if details.len() != legs.len() {
        tracing::warn!(
            request_id = request.id,
            before = legs.len(),
            after = details.len(),
            "modification changes the number of legs"
        );
        return Err(EngineError::ModificationNotAllowed(format!(
            "request #{} has {} transactions, the modified one would have {}",
            request.id,
            legs.len(),
            details.len()
        )));
    }
    store::sync_transactions(db, &mut details, &legs, TransactionStatus::Pending).await?;
    store::update_owners(db, &subject.owners()).await?;
    store::update_request_amount_and_rate(db, request).await?;
    tracing::debug!(request_id = request.id, "pending request modified");
    Ok(details)
}

pub(crate) async fn cancel<S: Transfer>(
    subject: &mut S,
    db: &DatabaseTransaction,
    request: &mut Request,
    reason: &str,
) -> ResultEngine<()> {
    ensure_pending(request, "cancelled")?;
    let legs = store::load_transactions(db, request.id).await?;
    let owners = released(subject, &legs);

    store::update_transactions_status(db, request.id, TransactionStatus::Cancelled).await?;
    store::update_owners(db, &owners).await?;
    store::update_request_status_and_reason(db, request, RequestStatus::Cancelled, reason)
        .await?;
    tracing::debug!(request_id = request.id, reason, "request cancelled");
    Ok(())
}

/// Execute a single-phase subject straight from `new`.
pub(crate) async fn execute_once<S: Transfer>(
    subject: &mut S,
    db: &DatabaseTransaction,
    request: &mut Request,
    ctx: &Context<'_>,
    permissions: PermissionCheckers,
) -> ResultEngine<Details> {
    if request.status != RequestStatus::New {
        return Err(EngineError::UnexpectedStatus(format!(
            "only requests with status \"new\" could be executed: got \"{}\" status",
            request.status
        )));
    }
    permissions.check(db).await?;

    let mut details = evaluate(subject, request, Mode::Evaluate, ctx.currencies)?;
    store::save_transactions(db, &mut details, TransactionStatus::Executed).await?;
    store::update_owners(db, &subject.owners()).await?;
    finish::<S>(db, request, RequestStatus::Executed).await?;
    tracing::debug!(request_id = request.id, legs = details.len(), "request executed");
    Ok(details)
}

pub(crate) fn not_supported(operation: &str, subject: &str) -> EngineError {
    EngineError::OperationNotSupported(format!(
        "{operation} is not supported for {subject} requests"
    ))
}

/// Base and reference currencies of the request.
pub(crate) fn request_currencies(
    currencies: &dyn CurrencyProvider,
    request: &Request,
) -> ResultEngine<(Currency, Currency)> {
    Ok((
        currencies.get(&request.base_currency_code)?,
        currencies.get(&request.reference_currency_code)?,
    ))
}

pub(crate) fn ensure_currency(owner: &str, actual: &str, expected: &Currency) -> ResultEngine<()> {
    if !actual.eq_ignore_ascii_case(expected.code()) {
        return Err(EngineError::CurrenciesMismatch(format!(
            "{owner} currency is {actual}, expected {}",
            expected.code()
        )));
    }
    Ok(())
}

/// Rates captured on the request, usable in both directions.
pub(crate) fn request_rates(request: &Request) -> ResultEngine<Arc<dyn RateSource>> {
    let rate = request.rate.ok_or_else(|| {
        EngineError::MissingRequestData(format!("request #{} has no rate", request.id))
    })?;
    let direct = DirectRateSource::new().with(Rate::new(
        request.rate_base_currency_code(),
        request.rate_reference_currency_code(),
        rate,
    ));
    Ok(Arc::new(ReverseRateSource::new(direct)))
}

/// The request description unless empty.
pub(crate) fn description_or(request: &Request, default: &str) -> String {
    request
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(default)
        .to_string()
}

pub(crate) fn absorb_account(owners: &[Owner], account: &mut Account) {
    for owner in owners {
        if let Owner::Account(fresh) = owner
            && fresh.id == account.id
        {
            *account = fresh.clone();
        }
    }
}

pub(crate) fn absorb_card(owners: &[Owner], card: &mut Card) {
    for owner in owners {
        if let Owner::Card(fresh) = owner
            && fresh.id == card.id
        {
            *card = fresh.clone();
        }
    }
}

pub(crate) fn absorb_revenue(owners: &[Owner], revenue: &mut RevenueAccount) {
    for owner in owners {
        if let Owner::RevenueAccount(fresh) = owner
            && fresh.id == revenue.id
        {
            *revenue = fresh.clone();
        }
    }
}
