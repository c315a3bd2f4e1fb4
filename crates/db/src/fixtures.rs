use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const DEMO_COLLEGE: &str = "Northfield College";
const DEMO_DEPARTMENTS: &[&str] = &["Computer Science", "Physics"];

const DEMO_ACTORS: &[SeededActor] = &[
    SeededActor { id: "ACT-demo-carol", name: "Carol Reyes", role: "principal", department: None },
    SeededActor { id: "ACT-demo-bob", name: "Bob Okafor", role: "vice_principal", department: None },
    SeededActor {
        id: "ACT-demo-alice",
        name: "Alice Moreau",
        role: "hod",
        department: Some("Physics"),
    },
    SeededActor { id: "ACT-demo-sam", name: "Sam Patel", role: "student", department: Some("Physics") },
];

/// A small deterministic campus for demos and smoke tests: one approved actor
/// per role, enough to walk every request kind end to end.
pub struct DemoCampus;

impl DemoCampus {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_campus.sql");

    pub fn college() -> &'static str {
        DEMO_COLLEGE
    }

    pub fn actors() -> &'static [SeededActor] {
        DEMO_ACTORS
    }

    /// Loads the fixture. Re-running is a no-op.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult { college: DEMO_COLLEGE, actors_seeded: DEMO_ACTORS.to_vec() })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let college_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM colleges WHERE name = ?1 AND principal_id = ?2)",
        )
        .bind(DEMO_COLLEGE)
        .bind(DEMO_ACTORS[0].id)
        .fetch_one(pool)
        .await?;
        checks.push(("college", college_ok == 1));

        let departments: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM departments WHERE college_name = ?1 ORDER BY position ASC",
        )
        .bind(DEMO_COLLEGE)
        .fetch_all(pool)
        .await?;
        checks.push(("departments", departments == DEMO_DEPARTMENTS));

        for actor in DEMO_ACTORS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM actors
                               WHERE id = ?1 AND role = ?2 AND college = ?3
                                 AND department IS ?4 AND access_status = 'approved')",
            )
            .bind(actor.id)
            .bind(actor.role)
            .bind(DEMO_COLLEGE)
            .bind(actor.department)
            .fetch_one(pool)
            .await?;
            checks.push((actor.id, present == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo campus. Requests and messages of demo actors cascade.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM colleges WHERE name = ?1")
            .bind(DEMO_COLLEGE)
            .execute(&mut *tx)
            .await?;
        for actor in DEMO_ACTORS {
            sqlx::query("DELETE FROM actors WHERE id = ?1").bind(actor.id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeededActor {
    pub id: &'static str,
    pub name: &'static str,
    pub role: &'static str,
    pub department: Option<&'static str>,
}

#[derive(Debug)]
pub struct SeedResult {
    pub college: &'static str,
    pub actors_seeded: Vec<SeededActor>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    async fn migrated() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    #[test]
    fn sql_fixture_mentions_every_actor() {
        for actor in DemoCampus::actors() {
            assert!(DemoCampus::SQL.contains(actor.id), "{} missing from fixture", actor.id);
        }
    }

    #[tokio::test]
    async fn load_is_idempotent_and_verifies() {
        let pool = migrated().await;

        let first = DemoCampus::load(&pool).await.expect("load");
        let first_verification = DemoCampus::verify(&pool).await.expect("verify");
        assert!(first_verification.all_present, "{:?}", first_verification.checks);
        assert_eq!(first.actors_seeded.len(), 4);

        DemoCampus::load(&pool).await.expect("reload");
        let second_verification = DemoCampus::verify(&pool).await.expect("re-verify");
        assert_eq!(first_verification.checks, second_verification.checks);

        let actor_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM actors").fetch_one(&pool).await.expect("count");
        assert_eq!(actor_count, 4);
    }

    #[tokio::test]
    async fn clean_removes_the_campus() {
        let pool = migrated().await;
        DemoCampus::load(&pool).await.expect("load");

        DemoCampus::clean(&pool).await.expect("clean");

        let verification = DemoCampus::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        let departments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(departments, 0);
    }
}
