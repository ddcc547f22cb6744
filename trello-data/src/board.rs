use chrono::Utc;
use serde::{Deserialize, Serialize};
use testdata::{Entity, EntityFactory};

/// Trello board: the root of the board -> list -> card dependency chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Board {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "desc", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_member_creator: Option<String>,
}

impl Entity for Board {
    const KIND: &'static str = "board";

    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_identifier(&mut self, id: String) {
        self.id = Some(id);
    }
}

pub struct BoardFactory;

impl EntityFactory<Board> for BoardFactory {
    fn build_default(&self) -> Board {
        Board {
            name: Some(format!(
                "Default Test Board {}",
                Utc::now().timestamp_millis()
            )),
            description: Some("Default board created by the test-data engine".to_string()),
            closed: Some(false),
            pinned: Some(false),
            starred: Some(false),
            subscribed: Some(false),
            ..Board::default()
        }
    }
}
