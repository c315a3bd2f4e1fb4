use crate::commands::{with_database, CommandResult};
use letterflow_db::{migrations, DemoCampus, SeedResult};

pub fn run() -> CommandResult {
    let result = with_database("seed", |_config, pool| async move {
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = DemoCampus::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoCampus::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
        }
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(failure) => failure,
    }
}

fn summary(seeded: &SeedResult) -> String {
    let lines: Vec<String> = seeded
        .actors_seeded
        .iter()
        .map(|actor| match actor.department {
            Some(department) => {
                format!("  - {}: {} ({}, {department})", actor.role, actor.id, actor.name)
            }
            None => format!("  - {}: {} ({})", actor.role, actor.id, actor.name),
        })
        .collect();
    format!("demo campus `{}` loaded:\n{}", seeded.college, lines.join("\n"))
}

fn verification_failure_message(checks: &[(&str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
