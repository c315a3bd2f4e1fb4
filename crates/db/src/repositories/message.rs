use sqlx::sqlite::SqliteRow;

use letterflow_core::domain::message::MessageId;
use letterflow_core::{ActorId, EntityRef, Message, MessageKind, MessageStore, StoreError};

use super::{get, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, content, kind, entity_type, entity_id, created_at";

pub struct SqlMessageRepository {
    pool: DbPool,
}

impl SqlMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        let (entity_type, entity_id) = match &message.entity {
            Some(entity) => (Some(entity.entity_type.as_str()), Some(entity.entity_id.as_str())),
            None => (None, None),
        };

        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, content, kind, entity_type,
                                   entity_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id.0)
        .bind(&message.sender.0)
        .bind(&message.receiver.0)
        .bind(&message.content)
        .bind(message.kind.as_str())
        .bind(entity_type)
        .bind(entity_id)
        .bind(timestamp(&message.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE entity_id = ? ORDER BY created_at ASC"
        ))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    pub async fn list_for_receiver(
        &self,
        receiver: &ActorId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE receiver_id = ? ORDER BY created_at ASC"
        ))
        .bind(&receiver.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }
}

fn row_to_message(row: &SqliteRow) -> Result<Message, RepositoryError> {
    let kind: String = get(row, "kind")?;
    let entity_type: Option<String> = get(row, "entity_type")?;
    let entity_id: Option<String> = get(row, "entity_id")?;
    let created_at: String = get(row, "created_at")?;

    let entity = match (entity_type, entity_id) {
        (Some(entity_type), Some(entity_id)) => Some(EntityRef { entity_type, entity_id }),
        (None, None) => None,
        _ => return Err(RepositoryError::Decode("message entity is half populated".to_string())),
    };

    Ok(Message {
        id: MessageId(get(row, "id")?),
        sender: ActorId(get(row, "sender_id")?),
        receiver: ActorId(get(row, "receiver_id")?),
        content: get(row, "content")?,
        kind: MessageKind::parse(&kind)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown message kind `{kind}`")))?,
        entity,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl MessageStore for SqlMessageRepository {
    async fn append(&self, message: Message) -> Result<(), StoreError> {
        Ok(SqlMessageRepository::append(self, &message).await?)
    }

    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Message>, StoreError> {
        Ok(SqlMessageRepository::list_for_entity(self, entity_id).await?)
    }

    async fn list_for_receiver(&self, receiver: &ActorId) -> Result<Vec<Message>, StoreError> {
        Ok(SqlMessageRepository::list_for_receiver(self, receiver).await?)
    }
}
