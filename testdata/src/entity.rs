//! Core entity contract shared by every HTTP-backed test resource.
//!
//! An [`Entity`] is a typed record with a remote identity and a statically
//! declared table of dependency bindings: references to other entities that
//! must exist (identifier assigned) before this one can be created. The
//! object-safe [`EntityNode`] view erases the concrete type so the resolver
//! can walk a heterogeneous dependency graph recursively.

use crate::session::Session;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntityError {
    #[error("No repository or factory registered for entity kind: {kind}")]
    UnregisteredKind { kind: &'static str },

    #[error("Remote rejected write for {kind} (status {status}): {message}")]
    RemoteWrite {
        kind: &'static str,
        status: u16,
        message: String,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Dependency cycle detected: {path}")]
    DependencyCycle { path: String },

    #[error("{kind} already has identifier {id}; entities are created exactly once")]
    IdentifierAssigned { kind: &'static str, id: String },

    #[error("{kind} has no identifier; create it before updating or deleting")]
    MissingIdentifier { kind: &'static str },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EntityResult<T> = Result<T, EntityError>;

/// A remote-backed record with a server-assigned identifier.
///
/// The identifier is empty before creation and immutable afterwards; the
/// repository assigns it from the create response. Dependency bindings are a
/// per-kind constant shape: the same fields for every instance of the kind.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable kind name used as the registry key and in diagnostics.
    const KIND: &'static str;

    fn identifier(&self) -> Option<&str>;

    fn set_identifier(&mut self, id: String);

    /// Declared prerequisite references, one binding per owned dependency
    /// instance. Kinds without dependencies keep the default empty table.
    fn dependency_bindings(&mut self) -> Vec<Binding<'_>> {
        Vec::new()
    }
}

/// One declared dependency: the owned prerequisite instance plus the
/// foreign-key slot on the dependent that receives its identifier.
pub struct Binding<'a> {
    pub field: &'static str,
    pub node: &'a mut dyn EntityNode,
    pub target: &'a mut Option<String>,
}

impl<'a> Binding<'a> {
    pub fn new(
        field: &'static str,
        node: &'a mut dyn EntityNode,
        target: &'a mut Option<String>,
    ) -> Self {
        Self {
            field,
            node,
            target,
        }
    }
}

/// Object-safe view of an [`Entity`] used by the dependency resolver.
#[async_trait]
pub trait EntityNode: Send {
    fn kind(&self) -> &'static str;

    fn identifier(&self) -> Option<&str>;

    fn is_created(&self) -> bool {
        self.identifier().map_or(false, |id| !id.is_empty())
    }

    fn dependency_bindings(&mut self) -> Vec<Binding<'_>>;

    async fn create_in(&mut self, session: &Session) -> EntityResult<()>;

    async fn delete_in(&mut self, session: &Session) -> EntityResult<()>;
}

#[async_trait]
impl<E: Entity> EntityNode for E {
    fn kind(&self) -> &'static str {
        E::KIND
    }

    fn identifier(&self) -> Option<&str> {
        Entity::identifier(self)
    }

    fn dependency_bindings(&mut self) -> Vec<Binding<'_>> {
        Entity::dependency_bindings(self)
    }

    async fn create_in(&mut self, session: &Session) -> EntityResult<()> {
        session.create(self).await.map(|_| ())
    }

    async fn delete_in(&mut self, session: &Session) -> EntityResult<()> {
        session.delete(self).await
    }
}
