use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::ActorId;
use crate::domain::request::RequestId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(format!("MSG-{}", Uuid::new_v4().simple()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Human,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "human" => Some(Self::Human),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Optional attachment of a message to a workflow entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn request(request_id: &RequestId, kind: &str) -> Self {
        Self { entity_type: kind.to_string(), entity_id: request_id.0.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: ActorId,
    pub receiver: ActorId,
    pub content: String,
    pub kind: MessageKind,
    pub entity: Option<EntityRef>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender: ActorId,
        receiver: ActorId,
        content: impl Into<String>,
        kind: MessageKind,
        entity: Option<EntityRef>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            sender,
            receiver,
            content: content.into(),
            kind,
            entity,
            created_at: Utc::now(),
        }
    }

    pub fn is_about(&self, request_id: &RequestId) -> bool {
        self.entity.as_ref().is_some_and(|entity| entity.entity_id == request_id.0)
    }
}
