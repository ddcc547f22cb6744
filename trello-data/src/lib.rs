//! Trello entities, factories, and repository wiring for the `testdata`
//! lifecycle engine. Trello's board/list/card schema is the illustrative
//! instantiation; the engine itself is schema-agnostic.

pub mod board;
pub mod card;
pub mod list;

pub use board::{Board, BoardFactory};
pub use card::{Card, CardFactory};
pub use list::{List, ListFactory};

use std::sync::Arc;
use testdata::{
    DataRegistry, DeletePolicy, FieldNamingPolicy, HttpTransport, JsonCodec, Repository,
};

/// Register every Trello repository and factory with `registry`. Safe to
/// call redundantly per test setup: registration is last-write-wins with no
/// other side effects.
pub fn register_all(registry: &DataRegistry, transport: Arc<dyn HttpTransport>) {
    let codec = JsonCodec::new(FieldNamingPolicy::CamelCase);

    registry.register_repository(Repository::<Board>::new(transport.clone(), "boards", codec));
    registry.register_repository(
        Repository::<List>::new(transport.clone(), "lists", codec)
            .with_delete_policy(DeletePolicy::SoftClose { field: "closed" }),
    );
    registry.register_repository(Repository::<Card>::new(transport, "cards", codec));

    registry.register_factory(BoardFactory);
    registry.register_factory(ListFactory);
    registry.register_factory(CardFactory);
}
