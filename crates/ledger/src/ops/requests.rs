use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, TransactionTrait};

use crate::{
    EngineError, ResultEngine,
    details::Details,
    requests::{self, Request, RequestStatus},
    store,
    subjects::Subject,
    transactions::Transaction,
};

use super::{Engine, with_tx};

/// New values for a pending request. Unset fields keep their value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestChanges {
    pub amount: Option<Decimal>,
    pub input_amount: Option<Decimal>,
    pub rate: Option<Decimal>,
}

impl RequestChanges {
    fn is_empty(&self) -> bool {
        self.amount.is_none() && self.input_amount.is_none() && self.rate.is_none()
    }

    fn apply(&self, request: &mut Request) {
        if let Some(amount) = self.amount {
            request.amount = Some(amount);
        }
        if let Some(input_amount) = self.input_amount {
            request.input_amount = Some(input_amount);
        }
        if let Some(rate) = self.rate {
            request.rate = Some(rate);
        }
    }
}

impl Engine {
    /// Store a new request. It always starts in status `new`.
    pub async fn create_request(&self, request: &Request) -> ResultEngine<Request> {
        if let Some(amount) = request.amount
            && amount <= Decimal::ZERO
        {
            return Err(EngineError::InvalidAmount(format!(
                "request amount must be positive: got {amount}"
            )));
        }
        let mut request = request.clone();
        request.id = 0;
        request.status = RequestStatus::New;
        request.status_changed_at = None;
        request.cancellation_reason = None;

        let model = requests::ActiveModel::from(&request)
            .insert(&self.database)
            .await?;
        tracing::debug!(request_id = model.id, subject = %model.subject, "request created");
        Request::try_from(model)
    }

    pub async fn request(&self, id: i64) -> ResultEngine<Request> {
        let model = requests::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("request #{id} not exists")))?;
        Request::try_from(model)
    }

    /// Persisted legs of a request in creation order.
    pub async fn request_transactions(&self, id: i64) -> ResultEngine<Vec<Transaction>> {
        store::load_transactions(&self.database, id).await
    }

    /// Legs the request would produce, with the owners' balances moved in
    /// memory only.
    pub async fn evaluate_request(&self, id: i64) -> ResultEngine<Details> {
        with_tx!(self, |db_tx| {
            let mut request = store::lock_request(&db_tx, id).await?;
            let mut subject = Subject::load(&db_tx, &request).await?;
            subject.evaluate(&mut request, &self.currencies)
        })
    }

    /// Legs the request would produce, without moving any balance.
    pub async fn dry_run_request(&self, id: i64) -> ResultEngine<Details> {
        with_tx!(self, |db_tx| {
            let mut request = store::lock_request(&db_tx, id).await?;
            let subject = Subject::load(&db_tx, &request).await?;
            subject.dry_run(&mut request, &self.currencies)
        })
    }

    /// Hold the debited amounts and store the legs as pending.
    pub async fn pending_request(&self, id: i64) -> ResultEngine<Details> {
        with_tx!(self, |db_tx| {
            let mut request = store::lock_request(&db_tx, id).await?;
            let mut subject = Subject::load(&db_tx, &request).await?;
            subject
                .pending(&db_tx, &mut request, &self.context())
                .await
        })
    }

    /// Execute a new request directly or settle a pending one.
    pub async fn execute_request(&self, id: i64) -> ResultEngine<Details> {
        with_tx!(self, |db_tx| {
            let mut request = store::lock_request(&db_tx, id).await?;
            let mut subject = Subject::load(&db_tx, &request).await?;
            subject
                .execute(&db_tx, &mut request, &self.context())
                .await
        })
    }

    /// Change the amount, input amount or rate of a pending request and
    /// recompute its legs in place.
    pub async fn modify_request(&self, id: i64, changes: RequestChanges) -> ResultEngine<Details> {
        if changes.is_empty() {
            return Err(EngineError::ModificationNotAllowed(format!(
                "request #{id}: nothing to change"
            )));
        }
        with_tx!(self, |db_tx| {
            let mut request = store::lock_request(&db_tx, id).await?;
            changes.apply(&mut request);
            let mut subject = Subject::load(&db_tx, &request).await?;
            subject
                .modify(&db_tx, &mut request, &self.context())
                .await
        })
    }

    /// Cancel a pending request and release its holds.
    pub async fn cancel_request(&self, id: i64, reason: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let mut request = store::lock_request(&db_tx, id).await?;
            let mut subject = Subject::load(&db_tx, &request).await?;
            subject.cancel(&db_tx, &mut request, reason).await
        })
    }
}
