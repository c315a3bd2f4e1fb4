use sqlx::sqlite::SqliteRow;

use letterflow_core::{AccessStatus, Actor, ActorId, ActorStore, Role, StoreError};

use super::{get, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const ACTOR_COLUMNS: &str = "id, name, email, role, college, department, access_status,
                             created_at, updated_at";

pub struct SqlActorRepository {
    pool: DbPool,
}

impl SqlActorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &ActorId) -> Result<Option<Actor>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ACTOR_COLUMNS} FROM actors WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_actor).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Actor>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ACTOR_COLUMNS} FROM actors WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_actor).transpose()
    }

    pub async fn insert(&self, actor: &Actor) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO actors (id, name, email, role, college, department, access_status,
                                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&actor.id.0)
        .bind(&actor.name)
        .bind(&actor.email)
        .bind(actor.role.as_str())
        .bind(&actor.college)
        .bind(&actor.department)
        .bind(actor.access_status.as_str())
        .bind(timestamp(&actor.created_at))
        .bind(timestamp(&actor.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update(&self, actor: &Actor) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE actors
             SET name = ?, email = ?, role = ?, college = ?, department = ?,
                 access_status = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&actor.name)
        .bind(&actor.email)
        .bind(actor.role.as_str())
        .bind(&actor.college)
        .bind(&actor.department)
        .bind(actor.access_status.as_str())
        .bind(timestamp(&actor.updated_at))
        .bind(&actor.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing { entity: "actor", id: actor.id.0.clone() });
        }
        Ok(())
    }

    pub async fn list_by_college(&self, college: &str) -> Result<Vec<Actor>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACTOR_COLUMNS} FROM actors WHERE college = ? ORDER BY created_at ASC"
        ))
        .bind(college)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_actor).collect()
    }
}

fn row_to_actor(row: &SqliteRow) -> Result<Actor, RepositoryError> {
    let role: String = get(row, "role")?;
    let access_status: String = get(row, "access_status")?;
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    Ok(Actor {
        id: ActorId(get(row, "id")?),
        name: get(row, "name")?,
        email: get(row, "email")?,
        role: Role::parse(&role)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown role `{role}`")))?,
        college: get(row, "college")?,
        department: get(row, "department")?,
        access_status: AccessStatus::parse(&access_status).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown access status `{access_status}`"))
        })?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl ActorStore for SqlActorRepository {
    async fn find(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        Ok(self.find_by_id(id).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Actor>, StoreError> {
        Ok(SqlActorRepository::find_by_email(self, email).await?)
    }

    async fn insert(&self, actor: Actor) -> Result<(), StoreError> {
        Ok(SqlActorRepository::insert(self, &actor).await?)
    }

    async fn update(&self, actor: Actor) -> Result<(), StoreError> {
        Ok(SqlActorRepository::update(self, &actor).await?)
    }

    async fn list_by_college(&self, college: &str) -> Result<Vec<Actor>, StoreError> {
        Ok(SqlActorRepository::list_by_college(self, college).await?)
    }
}
