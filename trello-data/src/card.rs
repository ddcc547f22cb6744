use crate::list::List;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use testdata::{Binding, DataRegistry, Entity, EntityFactory, EntityResult};

/// Trello card, the leaf of the dependency chain: a card requires a list,
/// which in turn requires a board.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Card {
    /// Owned prerequisite wired by the dependency resolver; never serialized.
    #[serde(skip)]
    pub list: Option<List>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "desc", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_board: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_link: Option<String>,
}

impl Entity for Card {
    const KIND: &'static str = "card";

    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_identifier(&mut self, id: String) {
        self.id = Some(id);
    }

    fn dependency_bindings(&mut self) -> Vec<Binding<'_>> {
        let Self { list, id_list, .. } = self;
        list.as_mut()
            .map(|node| Binding::new("id_list", node, id_list))
            .into_iter()
            .collect()
    }
}

pub struct CardFactory;

impl EntityFactory<Card> for CardFactory {
    fn build_default(&self) -> Card {
        Card {
            name: Some(format!(
                "Default Test Card {}",
                Utc::now().timestamp_millis()
            )),
            description: Some("Default card created by the test-data engine".to_string()),
            closed: Some(false),
            due_complete: Some(false),
            ..Card::default()
        }
    }

    fn build_default_for(&self, list_id: &str) -> Card {
        let mut card = self.build_default();
        card.id_list = Some(list_id.to_string());
        card
    }

    fn build_with_dependencies(&self, registry: &DataRegistry) -> EntityResult<Card> {
        let mut card = self.build_default();
        card.list = Some(registry.factory::<List>()?.build_with_dependencies(registry)?);
        Ok(card)
    }
}
