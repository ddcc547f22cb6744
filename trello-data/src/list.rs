use crate::board::Board;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use testdata::{Binding, DataRegistry, Entity, EntityFactory, EntityResult};

/// Trello list. Lists cannot be removed through the API, so their
/// repository is registered with the soft-close delete policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct List {
    /// Owned prerequisite wired by the dependency resolver; never serialized.
    #[serde(skip)]
    pub board: Option<Board>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_board: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Entity for List {
    const KIND: &'static str = "list";

    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_identifier(&mut self, id: String) {
        self.id = Some(id);
    }

    fn dependency_bindings(&mut self) -> Vec<Binding<'_>> {
        let Self { board, id_board, .. } = self;
        board
            .as_mut()
            .map(|node| Binding::new("id_board", node, id_board))
            .into_iter()
            .collect()
    }
}

pub struct ListFactory;

impl EntityFactory<List> for ListFactory {
    fn build_default(&self) -> List {
        List {
            name: Some(format!(
                "Default Test List {}",
                Utc::now().timestamp_millis()
            )),
            closed: Some(false),
            subscribed: Some(false),
            ..List::default()
        }
    }

    fn build_default_for(&self, board_id: &str) -> List {
        let mut list = self.build_default();
        list.id_board = Some(board_id.to_string());
        list
    }

    fn build_with_dependencies(&self, registry: &DataRegistry) -> EntityResult<List> {
        let mut list = self.build_default();
        list.board = Some(registry.factory::<Board>()?.build_default());
        Ok(list)
    }
}
