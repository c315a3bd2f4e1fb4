use crate::commands::{with_database, CommandResult};
use letterflow_db::migrations;

pub fn run() -> CommandResult {
    let result = with_database("migrate", |_config, pool| async move {
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        migrations::applied_count(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))
    });

    match result {
        Ok(applied) => {
            CommandResult::success("migrate", format!("applied pending migrations ({applied} total)"))
        }
        Err(failure) => failure,
    }
}
