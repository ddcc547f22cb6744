//! Recursive dependency resolution.
//!
//! Creation walks the declared binding table depth-first, pre-order:
//! prerequisites are created before the entity that references them, and
//! each dependency's identifier is copied into the dependent's foreign-key
//! slot before the dependent is sent to the remote service. Deletion is the
//! mirror image: the entity first, then its owned dependencies, post-order
//! and best-effort.

use crate::entity::{EntityError, EntityNode, EntityResult};
use crate::session::Session;
use futures::future::BoxFuture;
use tracing::{debug, warn};

/// Create `node` after recursively creating every unsatisfied dependency.
///
/// `in_flight` holds the kinds currently being resolved on this call stack;
/// a kind reappearing means the declared graph is not a DAG and resolution
/// fails with [`EntityError::DependencyCycle`] before recursing further.
/// Fail-fast on any error: entities created earlier in the walk stay tracked
/// so normal teardown still removes them.
pub(crate) fn resolve_and_create<'a>(
    node: &'a mut dyn EntityNode,
    session: &'a Session,
    in_flight: &'a mut Vec<&'static str>,
) -> BoxFuture<'a, EntityResult<()>> {
    Box::pin(async move {
        let kind = node.kind();
        if in_flight.contains(&kind) {
            let mut path = in_flight.clone();
            path.push(kind);
            return Err(EntityError::DependencyCycle {
                path: path.join(" -> "),
            });
        }

        if node.is_created() {
            warn!(kind, id = ?node.identifier(), "entity already has an identifier; skipping create");
            return Ok(());
        }

        in_flight.push(kind);
        for binding in node.dependency_bindings() {
            if !binding.node.is_created() {
                resolve_and_create(binding.node, session, in_flight).await?;
            }
            *binding.target = binding.node.identifier().map(str::to_string);
            debug!(
                kind,
                field = binding.field,
                id = ?binding.target,
                "wired dependency identifier"
            );
        }
        in_flight.pop();

        node.create_in(session).await
    })
}

/// Delete `node`, then post-order delete each owned dependency still tracked
/// by this session. Pre-supplied dependencies were never tracked and are
/// left alone. Every failure is logged and skipped; the walk never aborts.
pub(crate) fn delete_tree<'a>(
    node: &'a mut dyn EntityNode,
    session: &'a Session,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let kind = node.kind();
        if node.is_created() {
            match node.delete_in(session).await {
                Ok(()) => debug!(kind, "deleted entity in dependency teardown"),
                Err(EntityError::NotFound { .. }) => debug!(kind, "entity already gone"),
                Err(error) => {
                    warn!(kind, %error, "failed to delete entity during dependency teardown");
                }
            }
        }

        for binding in node.dependency_bindings() {
            let dependency = binding.node;
            let tracked = dependency
                .identifier()
                .map_or(false, |id| !id.is_empty() && session.is_tracked(dependency.kind(), id));
            if tracked {
                delete_tree(dependency, session).await;
            }
        }
    })
}
