use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, sea_query::Expr,
};

use crate::limits;

use super::{Identifier, Limit, LimitError, ResultLimit, Value};

/// Persistence of limits.
///
/// Every method receives the connection to run on, so callers decide whether
/// limits are read inside their own database transaction.
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// Store a new limit.
    async fn save<C: ConnectionTrait>(&self, db: &C, limit: &Limit) -> ResultLimit<()>;
    /// Replace the value of the limit with the same identifier.
    async fn update<C: ConnectionTrait>(&self, db: &C, limit: &Limit) -> ResultLimit<()>;
    /// Limits matching the non-empty identifier fields.
    async fn find<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<Vec<Limit>>;
    /// Delete the limits matching the non-empty identifier fields.
    async fn delete<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<u64>;
}

/// Storage backed by the `limits` table.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqlStorage;

impl SqlStorage {
    fn condition(id: &Identifier) -> Condition {
        let mut condition = Condition::all();
        if !id.name.is_empty() {
            condition = condition.add(limits::Column::Name.eq(id.name.as_str()));
        }
        if !id.entity.is_empty() {
            condition = condition.add(limits::Column::Entity.eq(id.entity.as_str()));
        }
        if !id.entity_id.is_empty() {
            condition = condition.add(limits::Column::EntityId.eq(id.entity_id.as_str()));
        }
        condition
    }

    fn columns(value: &Value) -> (Option<String>, Option<String>) {
        match value {
            Value::NoLimit => (None, None),
            Value::Max {
                amount,
                currency_code,
            } => (
                Some(currency_code.clone()),
                Some(amount.normalize().to_string()),
            ),
        }
    }

    fn limit_from_model(model: limits::Model) -> ResultLimit<Limit> {
        let value = match (model.amount, model.currency_code) {
            (None, _) => Value::NoLimit,
            (Some(amount), currency_code) => {
                let amount = amount.parse::<Decimal>().map_err(|_| {
                    LimitError::InvalidAmount(format!(
                        "limit #{} has invalid amount {amount}",
                        model.id
                    ))
                })?;
                Value::max(amount, currency_code.as_deref().unwrap_or_default())
            }
        };
        Ok(Limit::new(
            Identifier::new(&model.name, &model.entity, &model.entity_id),
            value,
        ))
    }
}

impl Storage for SqlStorage {
    async fn save<C: ConnectionTrait>(&self, db: &C, limit: &Limit) -> ResultLimit<()> {
        let (currency_code, amount) = Self::columns(&limit.value);
        limits::ActiveModel {
            name: ActiveValue::Set(limit.id.name.clone()),
            entity: ActiveValue::Set(limit.id.entity.clone()),
            entity_id: ActiveValue::Set(limit.id.entity_id.clone()),
            currency_code: ActiveValue::Set(currency_code),
            amount: ActiveValue::Set(amount),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn update<C: ConnectionTrait>(&self, db: &C, limit: &Limit) -> ResultLimit<()> {
        let (currency_code, amount) = Self::columns(&limit.value);
        let result = limits::Entity::update_many()
            .col_expr(limits::Column::CurrencyCode, Expr::value(currency_code))
            .col_expr(limits::Column::Amount, Expr::value(amount))
            .filter(Self::condition(&limit.id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(LimitError::NotFound(format!(
                "nothing to update ({})",
                limit.id
            )));
        }
        Ok(())
    }

    async fn find<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<Vec<Limit>> {
        limits::Entity::find()
            .filter(Self::condition(id))
            .order_by_asc(limits::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(Self::limit_from_model)
            .collect()
    }

    async fn delete<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<u64> {
        let result = limits::Entity::delete_many()
            .filter(Self::condition(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

/// Decorator answering with a configured default when nothing is stored
/// for one of the known limit names.
#[derive(Clone, Debug)]
pub struct DefaultValuesStorage<S> {
    inner: S,
    defaults: HashMap<String, Value>,
}

impl<S: Storage> DefaultValuesStorage<S> {
    pub fn new(inner: S, defaults: HashMap<String, Value>) -> Self {
        Self { inner, defaults }
    }
}

impl<S: Storage> Storage for DefaultValuesStorage<S> {
    async fn save<C: ConnectionTrait>(&self, db: &C, limit: &Limit) -> ResultLimit<()> {
        self.inner.save(db, limit).await
    }

    async fn update<C: ConnectionTrait>(&self, db: &C, limit: &Limit) -> ResultLimit<()> {
        self.inner.update(db, limit).await
    }

    async fn find<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<Vec<Limit>> {
        let found = match self.inner.find(db, id).await {
            Ok(found) => found,
            Err(LimitError::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err),
        };
        if !found.is_empty() {
            return Ok(found);
        }
        Ok(self
            .defaults
            .get(&id.name)
            .map(|value| vec![Limit::new(id.clone(), value.clone())])
            .unwrap_or_default())
    }

    async fn delete<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<u64> {
        self.inner.delete(db, id).await
    }
}
