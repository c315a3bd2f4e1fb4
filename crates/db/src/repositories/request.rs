use sqlx::sqlite::SqliteRow;
use sqlx::{Sqlite, Transaction};

use letterflow_core::domain::request::ApprovalStep;
use letterflow_core::{
    ActorId, ApprovalChain, OverallStatus, Request, RequestId, RequestPayload, RequestStore, Role,
    Scope, StepDecision, StoreError,
};

use super::{get, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id, kind, submitter_id, college, department, payload_json,
                               chain_json, status, version, created_at, updated_at";

/// Requests with their approval steps. Steps live in their own table so the
/// schema can enforce a single pending step per request.
pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, request: &Request) -> Result<(), RepositoryError> {
        let payload_json = encode_json(&request.payload)?;
        let chain_json = encode_json(&request.chain)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO requests (id, kind, submitter_id, college, department, payload_json,
                                   chain_json, status, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(request.kind().as_str())
        .bind(&request.submitter_id.0)
        .bind(&request.scope.college)
        .bind(&request.scope.department)
        .bind(payload_json)
        .bind(chain_json)
        .bind(request.status.as_str())
        .bind(i64::from(request.version))
        .bind(timestamp(&request.created_at))
        .bind(timestamp(&request.updated_at))
        .execute(&mut *tx)
        .await?;

        upsert_steps(&mut tx, request).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let request = find_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(request)
    }

    /// Compare-and-swap on `version`: the header update and the step upserts
    /// commit together or not at all.
    pub async fn commit(
        &self,
        request: &Request,
        expected_version: u32,
    ) -> Result<(), RepositoryError> {
        let payload_json = encode_json(&request.payload)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE requests
             SET status = ?, version = ?, payload_json = ?, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(request.status.as_str())
        .bind(i64::from(request.version))
        .bind(payload_json)
        .bind(timestamp(&request.updated_at))
        .bind(&request.id.0)
        .bind(i64::from(expected_version))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM requests WHERE id = ?")
                .bind(&request.id.0)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists == 0 {
                RepositoryError::Missing { entity: "request", id: request.id.0.clone() }
            } else {
                RepositoryError::VersionConflict {
                    entity: "request",
                    id: request.id.0.clone(),
                    expected: expected_version,
                }
            });
        }

        upsert_steps(&mut tx, request).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_by_submitter(
        &self,
        submitter: &ActorId,
    ) -> Result<Vec<Request>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE submitter_id = ? ORDER BY created_at ASC"
        ))
        .bind(&submitter.0)
        .fetch_all(&mut *tx)
        .await?;

        let requests = hydrate_all(&mut tx, &rows).await?;
        tx.commit().await?;
        Ok(requests)
    }

    pub async fn list_open_in_college(&self, college: &str) -> Result<Vec<Request>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests
             WHERE college = ? AND status = 'in_progress'
             ORDER BY created_at ASC"
        ))
        .bind(college)
        .fetch_all(&mut *tx)
        .await?;

        let requests = hydrate_all(&mut tx, &rows).await?;
        tx.commit().await?;
        Ok(requests)
    }
}

/// Header and steps are read on one transaction so a concurrent commit cannot
/// land between the two queries.
pub(crate) async fn find_in(
    tx: &mut Transaction<'_, Sqlite>,
    id: &RequestId,
) -> Result<Option<Request>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut **tx)
        .await?;

    match row {
        Some(ref row) => Ok(Some(hydrate(tx, row).await?)),
        None => Ok(None),
    }
}

async fn hydrate_all(
    tx: &mut Transaction<'_, Sqlite>,
    rows: &[SqliteRow],
) -> Result<Vec<Request>, RepositoryError> {
    let mut requests = Vec::with_capacity(rows.len());
    for row in rows {
        requests.push(hydrate(tx, row).await?);
    }
    Ok(requests)
}

async fn hydrate(
    tx: &mut Transaction<'_, Sqlite>,
    row: &SqliteRow,
) -> Result<Request, RepositoryError> {
    let id: String = get(row, "id")?;
    let steps = sqlx::query(
        "SELECT position, stage_index, required_role, assignee_id, acted_by, decision,
                remarks, acted_at, created_at
         FROM approval_steps WHERE request_id = ? ORDER BY position ASC",
    )
    .bind(&id)
    .fetch_all(&mut **tx)
    .await?
    .iter()
    .map(row_to_step)
    .collect::<Result<Vec<_>, _>>()?;

    let payload_json: String = get(row, "payload_json")?;
    let chain_json: String = get(row, "chain_json")?;
    let status: String = get(row, "status")?;
    let version: i64 = get(row, "version")?;
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    let payload: RequestPayload = decode_json("payload_json", &payload_json)?;
    let kind: String = get(row, "kind")?;
    if payload.kind().as_str() != kind {
        return Err(RepositoryError::Decode(format!(
            "request `{id}` is stored as `{kind}` but carries a {} payload",
            payload.kind()
        )));
    }

    Ok(Request {
        id: RequestId(id),
        submitter_id: ActorId(get(row, "submitter_id")?),
        scope: Scope { college: get(row, "college")?, department: get(row, "department")? },
        payload,
        chain: decode_json::<ApprovalChain>("chain_json", &chain_json)?,
        status: OverallStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status}`")))?,
        steps,
        version: u32::try_from(version)
            .map_err(|_| RepositoryError::Decode(format!("version `{version}` out of range")))?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

/// Upserts in position order so a decided step leaves `pending` before its
/// successor is inserted.
async fn upsert_steps(
    tx: &mut Transaction<'_, Sqlite>,
    request: &Request,
) -> Result<(), RepositoryError> {
    for step in &request.steps {
        sqlx::query(
            "INSERT INTO approval_steps (request_id, position, stage_index, required_role,
                                         assignee_id, acted_by, decision, remarks, acted_at,
                                         created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(request_id, position) DO UPDATE SET
                 acted_by = excluded.acted_by,
                 decision = excluded.decision,
                 remarks = excluded.remarks,
                 acted_at = excluded.acted_at",
        )
        .bind(&request.id.0)
        .bind(i64::from(step.position))
        .bind(i64::from(step.stage_index))
        .bind(step.required_role.as_str())
        .bind(step.assignee.as_ref().map(|id| id.0.clone()))
        .bind(step.acted_by.as_ref().map(|id| id.0.clone()))
        .bind(step.decision.as_str())
        .bind(&step.remarks)
        .bind(step.acted_at.as_ref().map(timestamp))
        .bind(timestamp(&step.created_at))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn row_to_step(row: &SqliteRow) -> Result<ApprovalStep, RepositoryError> {
    let position: i64 = get(row, "position")?;
    let stage_index: i64 = get(row, "stage_index")?;
    let required_role: String = get(row, "required_role")?;
    let decision: String = get(row, "decision")?;
    let assignee: Option<String> = get(row, "assignee_id")?;
    let acted_by: Option<String> = get(row, "acted_by")?;
    let acted_at: Option<String> = get(row, "acted_at")?;
    let created_at: String = get(row, "created_at")?;

    let narrow = |column: &str, value: i64| {
        u32::try_from(value)
            .map_err(|_| RepositoryError::Decode(format!("{column} `{value}` out of range")))
    };

    Ok(ApprovalStep {
        position: narrow("position", position)?,
        stage_index: narrow("stage_index", stage_index)?,
        required_role: Role::parse(&required_role)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown role `{required_role}`")))?,
        assignee: assignee.map(ActorId),
        acted_by: acted_by.map(ActorId),
        decision: StepDecision::parse(&decision)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown decision `{decision}`")))?,
        remarks: get(row, "remarks")?,
        acted_at: acted_at.map(|value| parse_timestamp("acted_at", &value)).transpose()?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    value: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(value).map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

#[async_trait::async_trait]
impl RequestStore for SqlRequestRepository {
    async fn insert(&self, request: Request) -> Result<(), StoreError> {
        Ok(SqlRequestRepository::insert(self, &request).await?)
    }

    async fn find(&self, id: &RequestId) -> Result<Option<Request>, StoreError> {
        Ok(self.find_by_id(id).await?)
    }

    async fn commit(&self, request: Request, expected_version: u32) -> Result<(), StoreError> {
        Ok(SqlRequestRepository::commit(self, &request, expected_version).await?)
    }

    async fn list_by_submitter(&self, submitter: &ActorId) -> Result<Vec<Request>, StoreError> {
        Ok(SqlRequestRepository::list_by_submitter(self, submitter).await?)
    }

    async fn list_open_in_college(&self, college: &str) -> Result<Vec<Request>, StoreError> {
        Ok(SqlRequestRepository::list_open_in_college(self, college).await?)
    }
}
