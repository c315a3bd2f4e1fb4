use sqlx::sqlite::SqliteRow;
use sqlx::{Sqlite, Transaction};

use letterflow_core::{ActorId, College, CollegeStore, StoreError};

use super::{get, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const COLLEGE_COLUMNS: &str = "name, address, city, zip_code, principal_id, created_at";

pub struct SqlCollegeRepository {
    pool: DbPool,
}

impl SqlCollegeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<College>, RepositoryError> {
        self.find_where("name = ?", name).await
    }

    pub async fn find_by_principal(
        &self,
        principal: &ActorId,
    ) -> Result<Option<College>, RepositoryError> {
        self.find_where("principal_id = ?", &principal.0).await
    }

    /// Inserts the college and its departments in one transaction.
    pub async fn insert(&self, college: &College) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO colleges (name, address, city, zip_code, principal_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&college.name)
        .bind(&college.address)
        .bind(&college.city)
        .bind(&college.zip_code)
        .bind(&college.principal_id.0)
        .bind(timestamp(&college.created_at))
        .execute(&mut *tx)
        .await?;

        insert_departments(&mut tx, college).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Rewrites the address fields and the department list in one transaction.
    pub async fn update(&self, college: &College) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE colleges SET address = ?, city = ?, zip_code = ? WHERE name = ?",
        )
        .bind(&college.address)
        .bind(&college.city)
        .bind(&college.zip_code)
        .bind(&college.name)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing { entity: "college", id: college.name.clone() });
        }

        sqlx::query("DELETE FROM departments WHERE college_name = ?")
            .bind(&college.name)
            .execute(&mut *tx)
            .await?;
        insert_departments(&mut tx, college).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<College>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(&format!("SELECT {COLLEGE_COLUMNS} FROM colleges ORDER BY name ASC"))
            .fetch_all(&mut *tx)
            .await?;

        let mut colleges = Vec::with_capacity(rows.len());
        for row in &rows {
            colleges.push(hydrate(&mut tx, row).await?);
        }
        tx.commit().await?;
        Ok(colleges)
    }

    async fn find_where(
        &self,
        filter: &str,
        value: &str,
    ) -> Result<Option<College>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!("SELECT {COLLEGE_COLUMNS} FROM colleges WHERE {filter}"))
            .bind(value)
            .fetch_optional(&mut *tx)
            .await?;

        let college = match row {
            Some(ref row) => Some(hydrate(&mut tx, row).await?),
            None => None,
        };
        tx.commit().await?;
        Ok(college)
    }
}

async fn insert_departments(
    tx: &mut Transaction<'_, Sqlite>,
    college: &College,
) -> Result<(), RepositoryError> {
    for (position, department) in college.departments.iter().enumerate() {
        sqlx::query("INSERT INTO departments (college_name, name, position) VALUES (?, ?, ?)")
            .bind(&college.name)
            .bind(department)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn hydrate(
    tx: &mut Transaction<'_, Sqlite>,
    row: &SqliteRow,
) -> Result<College, RepositoryError> {
    let name: String = get(row, "name")?;
    let created_at: String = get(row, "created_at")?;
    let departments: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM departments WHERE college_name = ? ORDER BY position ASC",
    )
    .bind(&name)
    .fetch_all(&mut **tx)
    .await?;

    Ok(College {
        name,
        address: get(row, "address")?,
        city: get(row, "city")?,
        zip_code: get(row, "zip_code")?,
        principal_id: ActorId(get(row, "principal_id")?),
        departments,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl CollegeStore for SqlCollegeRepository {
    async fn find(&self, name: &str) -> Result<Option<College>, StoreError> {
        Ok(self.find_by_name(name).await?)
    }

    async fn insert(&self, college: College) -> Result<(), StoreError> {
        Ok(SqlCollegeRepository::insert(self, &college).await?)
    }

    async fn update(&self, college: College) -> Result<(), StoreError> {
        Ok(SqlCollegeRepository::update(self, &college).await?)
    }

    async fn find_by_principal(&self, principal: &ActorId) -> Result<Option<College>, StoreError> {
        Ok(SqlCollegeRepository::find_by_principal(self, principal).await?)
    }

    async fn list(&self) -> Result<Vec<College>, StoreError> {
        Ok(SqlCollegeRepository::list(self).await?)
    }
}
