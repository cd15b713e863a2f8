use sea_orm::ConnectionTrait;

use super::{Identifier, Limit, LimitError, ResultLimit, Storage, Value};

/// Manages limits on top of a [`Storage`].
#[derive(Clone, Debug, Default)]
pub struct LimitService<S> {
    storage: S,
}

impl<S: Storage> LimitService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a limit. The identifier must be complete and not used yet.
    pub async fn create<C: ConnectionTrait>(&self, db: &C, value: Value, id: Identifier) -> ResultLimit<Limit> {
        ensure_complete(&id)?;
        let existing = match self.storage.find(db, &id).await {
            Ok(existing) => existing,
            Err(LimitError::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err),
        };
        if !existing.is_empty() {
            return Err(LimitError::AlreadyExist(format!(
                "failed to create new limit: identifiable with the same properties is already exist ({id})"
            )));
        }
        let limit = Limit::new(id, value);
        self.storage.save(db, &limit).await?;
        Ok(limit)
    }

    /// Update a single limit, identified by a complete identifier.
    pub async fn update_one<C: ConnectionTrait>(&self, db: &C, value: Value, id: Identifier) -> ResultLimit<Limit> {
        ensure_complete(&id)?;
        let limit = Limit::new(id, value);
        self.storage.update(db, &limit).await?;
        Ok(limit)
    }

    /// First limit matching the identifier.
    pub async fn find_one<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<Limit> {
        self.find(db, id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LimitError::NotFound(id.to_string()))
    }

    pub async fn find<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<Vec<Limit>> {
        self.storage.find(db, id).await
    }

    /// Delete a single limit, identified by a complete identifier.
    pub async fn delete_one<C: ConnectionTrait>(&self, db: &C, id: &Identifier) -> ResultLimit<u64> {
        ensure_complete(id)?;
        self.storage.delete(db, id).await
    }

    /// Delete every limit attached to the entity.
    pub async fn delete_by_entity<C: ConnectionTrait>(&self, db: &C, entity: &str, entity_id: &str) -> ResultLimit<u64> {
        self.storage
            .delete(db, &Identifier::new("", entity, entity_id))
            .await
    }

    /// Delete every limit with the name.
    pub async fn delete_by_name<C: ConnectionTrait>(&self, db: &C, name: &str) -> ResultLimit<u64> {
        self.storage.delete(db, &Identifier::new(name, "", "")).await
    }
}

fn ensure_complete(id: &Identifier) -> ResultLimit<()> {
    let missing = id.missing();
    if !missing.is_empty() {
        return Err(LimitError::IdIncomplete(format!(
            "the following identifier properties are required: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
