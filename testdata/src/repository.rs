//! Generic CRUD client bound to one entity kind and one remote collection.

use crate::cleanup::CleanupHandle;
use crate::codec::JsonCodec;
use crate::entity::{Entity, EntityError, EntityResult};
use crate::http::{HttpMethod, HttpResponse, HttpTransport};
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Per-kind deletion policy. Some resources cannot be removed through the
/// API and are marked terminal instead (e.g. Trello lists are closed, never
/// deleted); the cleanup path treats both outcomes the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    #[default]
    Hard,
    SoftClose { field: &'static str },
}

/// Stateless CRUD client for one entity kind. All configuration (collection
/// path segment, codec policy, delete policy) is fixed at construction.
pub struct Repository<E: Entity> {
    transport: Arc<dyn HttpTransport>,
    collection: &'static str,
    codec: JsonCodec,
    delete_policy: DeletePolicy,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        collection: &'static str,
        codec: JsonCodec,
    ) -> Self {
        Self {
            transport,
            collection,
            codec,
            delete_policy: DeletePolicy::Hard,
            _entity: PhantomData,
        }
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.collection, id)
    }

    fn write_failure(&self, response: &HttpResponse) -> EntityError {
        EntityError::RemoteWrite {
            kind: E::KIND,
            status: response.status,
            message: body_message(response),
        }
    }

    fn decode_body(&self, response: HttpResponse) -> EntityResult<E> {
        let status = response.status;
        let body = response.body.ok_or_else(|| EntityError::RemoteWrite {
            kind: E::KIND,
            status,
            message: "empty response body".to_string(),
        })?;
        self.codec.decode(body)
    }

    /// Send the entity's current state to the remote collection. The
    /// identifier must be unassigned; on success the server-assigned
    /// identifier is written back into `entity` and the full server state is
    /// returned.
    pub async fn create(&self, entity: &mut E) -> EntityResult<E> {
        if let Some(id) = entity.identifier().filter(|id| !id.is_empty()) {
            return Err(EntityError::IdentifierAssigned {
                kind: E::KIND,
                id: id.to_string(),
            });
        }

        let body = self.codec.encode(entity)?;
        let response = self
            .transport
            .send(HttpMethod::Post, self.collection, Some(&body))
            .await?;
        if !response.is_success() {
            return Err(self.write_failure(&response));
        }

        let status = response.status;
        let created = self.decode_body(response)?;
        match created.identifier().filter(|id| !id.is_empty()) {
            Some(id) => entity.set_identifier(id.to_string()),
            None => {
                return Err(EntityError::RemoteWrite {
                    kind: E::KIND,
                    status,
                    message: "create response missing identifier".to_string(),
                })
            }
        }

        debug!(kind = E::KIND, id = ?entity.identifier(), "created entity");
        Ok(created)
    }

    pub async fn get(&self, id: &str) -> EntityResult<E> {
        let response = self
            .transport
            .send(HttpMethod::Get, &self.item_path(id), None)
            .await?;
        match response.status {
            404 => Err(EntityError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            }),
            _ if response.is_success() => self.decode_body(response),
            _ => Err(self.write_failure(&response)),
        }
    }

    /// Send the full current field set for an already-created entity and
    /// return the refreshed server state.
    pub async fn update(&self, entity: &E) -> EntityResult<E> {
        let id = entity
            .identifier()
            .filter(|id| !id.is_empty())
            .ok_or(EntityError::MissingIdentifier { kind: E::KIND })?;

        let body = self.codec.encode(entity)?;
        let response = self
            .transport
            .send(HttpMethod::Put, &self.item_path(id), Some(&body))
            .await?;
        match response.status {
            404 => Err(EntityError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            }),
            _ if response.is_success() => self.decode_body(response),
            _ => Err(self.write_failure(&response)),
        }
    }

    pub async fn delete(&self, entity: &E) -> EntityResult<()> {
        let id = entity
            .identifier()
            .filter(|id| !id.is_empty())
            .ok_or(EntityError::MissingIdentifier { kind: E::KIND })?;
        self.delete_by_id(id).await
    }

    /// Remove (or soft-close) the resource by identifier. After an `Ok`
    /// return the resource is excluded from normal listing and use.
    pub async fn delete_by_id(&self, id: &str) -> EntityResult<()> {
        let path = self.item_path(id);
        let response = match self.delete_policy {
            DeletePolicy::Hard => self.transport.send(HttpMethod::Delete, &path, None).await?,
            DeletePolicy::SoftClose { field } => {
                let mut patch = serde_json::Map::new();
                patch.insert(field.to_string(), Value::Bool(true));
                let body = self.codec.encode(&Value::Object(patch))?;
                self.transport
                    .send(HttpMethod::Put, &path, Some(&body))
                    .await?
            }
        };
        match response.status {
            404 => Err(EntityError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            }),
            _ if response.is_success() => {
                debug!(kind = E::KIND, id, "deleted entity");
                Ok(())
            }
            _ => Err(self.write_failure(&response)),
        }
    }
}

fn body_message(response: &HttpResponse) -> String {
    match &response.body {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "no response body".to_string(),
    }
}

#[async_trait]
impl<E: Entity> CleanupHandle for Repository<E> {
    fn kind(&self) -> &'static str {
        E::KIND
    }

    async fn delete_identifier(&self, id: &str) -> EntityResult<()> {
        self.delete_by_id(id).await
    }
}
