use std::sync::Arc;

use letterflow_core::config::{AppConfig, ConfigError, LoadOptions};
use letterflow_core::{TracingAuditSink, WorkflowService};
use letterflow_db::{connect_with_config, migrations, sql_stores, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<WorkflowService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[cfg(test)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        database_url = %config.database.url,
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let service = WorkflowService::new(
        sql_stores(db_pool.clone()),
        Arc::new(TracingAuditSink),
        config.workflow.clone(),
    );
    info!(
        event_name = "system.bootstrap.workflow_ready",
        correlation_id = "bootstrap",
        certificate_forward_role = %config.workflow.certificate_forward_role,
        notifications_enabled = config.workflow.notifications_enabled,
        "workflow service initialized"
    );

    Ok(Application { config, db_pool, service: Arc::new(service) })
}

#[cfg(test)]
mod tests {
    use letterflow_core::config::{ConfigOverrides, LoadOptions};
    use letterflow_core::{
        ActorId, CertificatePayload, Decision, DecisionCommand, OverallStatus, RequestPayload,
    };
    use letterflow_db::DemoCampus;

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_database_urls() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/letterflow".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let error = result.err().expect("bootstrap should fail");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("database.url"));
    }

    #[tokio::test]
    async fn bootstrap_wires_the_workflow_to_the_migrated_database() {
        let app = bootstrap(memory_options()).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('actors', 'colleges', 'requests', 'approval_steps', 'messages')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("baseline tables should exist after bootstrap");
        assert_eq!(table_count, 5);

        DemoCampus::load(&app.db_pool).await.expect("seed demo campus");
        let demo = |id: &str| ActorId(id.to_string());
        let sam = demo("ACT-demo-sam");

        let request_id = app
            .service
            .create_request(
                &sam,
                RequestPayload::Certificate(CertificatePayload {
                    certificates: vec!["Bonafide".to_string()],
                    purpose: "Scholarship".to_string(),
                }),
            )
            .await
            .expect("create certificate request");

        for (actor_id, decision) in
            [(demo("ACT-demo-alice"), Decision::Forwarded), (demo("ACT-demo-bob"), Decision::Approved)]
        {
            app.service
                .decide(DecisionCommand {
                    request_id: request_id.clone(),
                    actor_id,
                    decision,
                    remarks: None,
                    expected_step: None,
                })
                .await
                .expect("decision should apply");
        }

        let status = app.service.get_status(&request_id).await.expect("status");
        assert_eq!(status.overall_status, OverallStatus::InProgress);
        assert_eq!(status.version, 3);

        app.db_pool.close().await;
    }
}
