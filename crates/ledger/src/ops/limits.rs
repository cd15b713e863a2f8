use sea_orm::TransactionTrait;

use crate::{
    ResultEngine,
    limit::{Identifier, Limit, Value},
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a limit. The identifier has to be complete and unused.
    pub async fn create_limit(&self, id: Identifier, value: Value) -> ResultEngine<Limit> {
        with_tx!(self, |db_tx| {
            let limit = self.limits.create(&db_tx, value, id).await?;
            tracing::debug!(limit = %limit.id, "limit created");
            Ok(limit)
        })
    }

    pub async fn update_limit(&self, id: Identifier, value: Value) -> ResultEngine<Limit> {
        with_tx!(self, |db_tx| {
            let limit = self.limits.update_one(&db_tx, value, id).await?;
            tracing::debug!(limit = %limit.id, "limit updated");
            Ok(limit)
        })
    }

    /// The stored limit; configured defaults do not apply here.
    pub async fn find_limit(&self, id: &Identifier) -> ResultEngine<Limit> {
        Ok(self.limits.find_one(&self.database, id).await?)
    }

    /// Limits matching the non-empty identifier fields.
    pub async fn find_limits(&self, id: &Identifier) -> ResultEngine<Vec<Limit>> {
        Ok(self.limits.find(&self.database, id).await?)
    }

    pub async fn delete_limit(&self, id: &Identifier) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            let deleted = self.limits.delete_one(&db_tx, id).await?;
            tracing::debug!(limit = %id, deleted, "limit deleted");
            Ok(deleted)
        })
    }
}
