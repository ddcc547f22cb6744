//! One test execution's view of the engine.

use crate::cleanup::{CleanupReport, CleanupTracker};
use crate::entity::{Entity, EntityError, EntityResult};
use crate::registry::DataRegistry;
use crate::repository::Repository;
use crate::resolver;
use std::sync::Arc;

/// Binds a shared registry to a cleanup tracker scoped to a single test.
/// Trackers are never shared between sessions, so parallel tests cannot
/// delete each other's entities.
pub struct Session {
    registry: Arc<DataRegistry>,
    tracker: CleanupTracker,
}

impl Session {
    pub fn new(registry: Arc<DataRegistry>) -> Self {
        let tracker = CleanupTracker::new();
        tracker.on_test_start();
        Self { registry, tracker }
    }

    pub fn registry(&self) -> &DataRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &CleanupTracker {
        &self.tracker
    }

    pub fn repository<E: Entity>(&self) -> EntityResult<Arc<Repository<E>>> {
        self.registry.repository::<E>()
    }

    pub fn is_tracked(&self, kind: &str, id: &str) -> bool {
        self.tracker.is_tracked(kind, id)
    }

    /// Create the entity and register it for automatic teardown.
    pub async fn create<E: Entity>(&self, entity: &mut E) -> EntityResult<E> {
        let repository = self.repository::<E>()?;
        let created = repository.create(entity).await?;
        if let Some(id) = entity.identifier() {
            self.tracker
                .on_entity_created(E::KIND, id.to_string(), repository);
        }
        Ok(created)
    }

    pub async fn get<E: Entity>(&self, id: &str) -> EntityResult<E> {
        self.repository::<E>()?.get(id).await
    }

    pub async fn update<E: Entity>(&self, entity: &E) -> EntityResult<E> {
        self.repository::<E>()?.update(entity).await
    }

    /// Manual delete: removes the remote resource and unregisters the entity
    /// from automatic cleanup. An already-gone resource still unregisters,
    /// since the remote state is terminal either way.
    pub async fn delete<E: Entity>(&self, entity: &E) -> EntityResult<()> {
        let repository = self.repository::<E>()?;
        let result = repository.delete(entity).await;
        if let Some(id) = entity.identifier() {
            match &result {
                Ok(()) | Err(EntityError::NotFound { .. }) => {
                    self.tracker.on_entity_deleted(E::KIND, id);
                }
                Err(_) => {}
            }
        }
        result
    }

    /// Create the entity's unsatisfied prerequisites bottom-up, then the
    /// entity itself. Everything created here is tracked for teardown.
    pub async fn create_with_dependencies<E: Entity>(&self, entity: &mut E) -> EntityResult<()> {
        let mut in_flight = Vec::new();
        resolver::resolve_and_create(entity, self, &mut in_flight).await
    }

    /// Best-effort inverse walk: the entity first, then each owned
    /// dependency created through this session.
    pub async fn delete_dependencies_and_self<E: Entity>(&self, entity: &mut E) {
        resolver::delete_tree(entity, self).await;
    }

    /// Teardown hook: drains the tracker in reverse creation order and
    /// returns the aggregate report. Cleanup failures are reported, never
    /// raised.
    pub async fn finish(&self) -> CleanupReport {
        self.tracker.on_test_end().await
    }
}
