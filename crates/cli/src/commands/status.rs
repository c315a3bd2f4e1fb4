use std::sync::Arc;

use crate::commands::{with_database, CommandResult};
use letterflow_core::{RequestId, StepDecision, TracingAuditSink, WorkflowError, WorkflowService};
use letterflow_db::sql_stores;

pub fn run(request_id: &str) -> CommandResult {
    let request_id = RequestId(request_id.trim().to_string());

    let result = with_database("status", |config, pool| async move {
        let service =
            WorkflowService::new(sql_stores(pool), Arc::new(TracingAuditSink), config.workflow);
        service.get_status(&request_id).await.map_err(|error| match error {
            WorkflowError::NotFound { .. } => ("not_found", error.to_string(), 7u8),
            other => ("workflow", other.to_string(), 5u8),
        })
    });

    match result {
        Ok(view) => {
            let pending = view
                .steps
                .iter()
                .find(|step| step.decision == StepDecision::Pending)
                .map(|step| format!(", waiting on {}", step.role))
                .unwrap_or_default();
            let message = format!(
                "{} {} is {}{pending}",
                view.kind,
                view.request_id,
                view.overall_status.as_str()
            );
            CommandResult::success_with_data("status", message, serde_json::to_value(&view).ok())
        }
        Err(failure) => failure,
    }
}
