//! Existence probing and idempotent creation.
//!
//! `ensure` is not an upsert: an existing entity is returned as-is and its
//! attributes are never reconciled against the requested spec.

use async_trait::async_trait;

use crate::{Ensured, Lookup, ProvisionError, ProvisionResult};

/// A named remote entity that can be probed and created.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Identifying attributes returned after probing.
    type Entity: Send;

    /// Entity kind, for logs and step records (e.g. "realm").
    fn kind(&self) -> &'static str;

    /// Name unique within the entity's parent scope.
    fn name(&self) -> &str;

    /// Looks the entity up. Only an explicit not-found signal yields
    /// [`Lookup::NotFound`].
    async fn lookup(&self) -> ProvisionResult<Lookup<Self::Entity>>;

    /// Issues the create call.
    async fn create(&self) -> ProvisionResult<()>;
}

/// Returns whether the resource currently exists.
pub async fn exists<R: Resource + ?Sized>(resource: &R) -> ProvisionResult<bool> {
    Ok(resource.lookup().await?.is_found())
}

/// Creates the resource only if it is absent.
///
/// A duplicate-creation error from a concurrent provisioner propagates
/// unchanged; nothing is retried.
pub async fn ensure<R: Resource + ?Sized>(resource: &R) -> ProvisionResult<Ensured<R::Entity>> {
    if let Lookup::Found(entity) = resource.lookup().await? {
        tracing::info!(kind = resource.kind(), name = resource.name(), "already exists");
        return Ok(Ensured::Existing(entity));
    }

    resource.create().await?;

    match resource.lookup().await? {
        Lookup::Found(entity) => {
            tracing::info!(kind = resource.kind(), name = resource.name(), "created");
            Ok(Ensured::Created(entity))
        }
        Lookup::NotFound => Err(ProvisionError::Inconsistent(format!(
            "{} '{}' was created but is not visible",
            resource.kind(),
            resource.name()
        ))),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn creates_absent_entity_once() {
        let store = FakeStore::default();
        let outcome = ensure(&FakeResource::new(&store, "calendar")).await.unwrap();
        assert_eq!(outcome, Ensured::Created("id-calendar".to_string()));
        assert_eq!(store.create_count(), 1);
    }

    #[tokio::test]
    async fn second_ensure_performs_no_create() {
        let store = FakeStore::default();
        let resource = FakeResource::new(&store, "calendar");
        ensure(&resource).await.unwrap();
        let again = ensure(&resource).await.unwrap();
        assert_eq!(again, Ensured::Existing("id-calendar".to_string()));
        assert_eq!(store.create_count(), 1);
    }

    #[tokio::test]
    async fn existing_entity_is_returned_untouched() {
        let store = FakeStore::default();
        store.insert("calendar");
        let outcome = ensure(&FakeResource::new(&store, "calendar")).await.unwrap();
        assert!(!outcome.was_created());
        assert_eq!(store.create_count(), 0);
    }

    #[tokio::test]
    async fn probe_failure_propagates_instead_of_creating() {
        let store = FakeStore::default();
        let resource = FakeResource::new(&store, "calendar").with(Behaviour::ProbeFails(500));
        let err = ensure(&resource).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(store.create_count(), 0);
        assert!(exists(&resource).await.is_err());
    }

    #[tokio::test]
    async fn conflict_on_create_propagates() {
        let store = FakeStore::default();
        let resource = FakeResource::new(&store, "calendar").with(Behaviour::CreateFails(409));
        let err = ensure(&resource).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn invisible_after_create_is_inconsistent() {
        let store = FakeStore::default();
        let resource = FakeResource::new(&store, "ghost").with(Behaviour::Invisible);
        let err = ensure(&resource).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Inconsistent(_)));
    }
}
