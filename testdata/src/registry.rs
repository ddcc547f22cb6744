use crate::entity::{Entity, EntityError, EntityResult};
use crate::repository::Repository;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Builds default-populated entity instances for one kind. Pure
/// construction: no remote calls, identifiers left empty.
pub trait EntityFactory<E: Entity>: Send + Sync {
    fn build_default(&self) -> E;

    /// Default instance wired to a known parent identifier. Kinds without a
    /// parent ignore it.
    fn build_default_for(&self, parent_id: &str) -> E {
        let _ = parent_id;
        self.build_default()
    }

    /// Default instance with default instances recursively wired into every
    /// declared dependency slot, identifiers still empty.
    fn build_with_dependencies(&self, registry: &DataRegistry) -> EntityResult<E> {
        let _ = registry;
        Ok(self.build_default())
    }
}

type AnyEntry = Box<dyn Any + Send + Sync>;

/// Process-wide mapping from entity kind to its repository and its default
/// factory. Registration is idempotent (last write wins); lookups of an
/// unregistered kind fail with [`EntityError::UnregisteredKind`].
#[derive(Default)]
pub struct DataRegistry {
    repositories: RwLock<HashMap<&'static str, AnyEntry>>,
    factories: RwLock<HashMap<&'static str, AnyEntry>>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<DataRegistry>> = OnceLock::new();

impl DataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared process-wide instance for suites that bootstrap once at
    /// startup rather than constructing and passing their own registry.
    pub fn global() -> Arc<DataRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(DataRegistry::new()))
            .clone()
    }

    pub fn register_repository<E: Entity>(&self, repository: Repository<E>) {
        let entry: AnyEntry = Box::new(Arc::new(repository));
        self.repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(E::KIND, entry);
    }

    pub fn repository<E: Entity>(&self) -> EntityResult<Arc<Repository<E>>> {
        self.repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(E::KIND)
            .and_then(|entry| entry.downcast_ref::<Arc<Repository<E>>>())
            .cloned()
            .ok_or(EntityError::UnregisteredKind { kind: E::KIND })
    }

    pub fn register_factory<E: Entity>(&self, factory: impl EntityFactory<E> + 'static) {
        let entry: AnyEntry = Box::new(Arc::new(factory) as Arc<dyn EntityFactory<E>>);
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(E::KIND, entry);
    }

    pub fn factory<E: Entity>(&self) -> EntityResult<Arc<dyn EntityFactory<E>>> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(E::KIND)
            .and_then(|entry| entry.downcast_ref::<Arc<dyn EntityFactory<E>>>())
            .cloned()
            .ok_or(EntityError::UnregisteredKind { kind: E::KIND })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Widget {
        id: Option<String>,
        label: Option<String>,
    }

    impl Entity for Widget {
        const KIND: &'static str = "widget";

        fn identifier(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_identifier(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    struct LabelFactory(&'static str);

    impl EntityFactory<Widget> for LabelFactory {
        fn build_default(&self) -> Widget {
            Widget {
                id: None,
                label: Some(self.0.to_string()),
            }
        }
    }

    #[test]
    fn test_unregistered_kind_lookup_fails() {
        let registry = DataRegistry::new();
        let error = registry.factory::<Widget>().err().unwrap();
        assert!(matches!(
            error,
            EntityError::UnregisteredKind { kind: "widget" }
        ));
    }

    #[test]
    fn test_factory_registration_is_last_write_wins() {
        let registry = DataRegistry::new();
        registry.register_factory(LabelFactory("first"));
        registry.register_factory(LabelFactory("second"));

        let factory = registry.factory::<Widget>().unwrap();
        assert_eq!(factory.build_default().label.as_deref(), Some("second"));
    }

    #[test]
    fn test_default_build_for_parent_ignores_parent() {
        let registry = DataRegistry::new();
        registry.register_factory(LabelFactory("only"));
        let widget = registry
            .factory::<Widget>()
            .unwrap()
            .build_default_for("parent-1");
        assert_eq!(widget.label.as_deref(), Some("only"));
        assert!(widget.id.is_none());
    }
}
