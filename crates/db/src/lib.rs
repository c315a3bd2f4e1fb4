pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

use std::sync::Arc;

use letterflow_core::WorkflowStores;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoCampus, SeedResult, SeededActor, VerificationResult};
pub use repositories::{
    RepositoryError, SqlActorRepository, SqlCollegeRepository, SqlMessageRepository,
    SqlRequestRepository,
};

/// Store ports for the workflow service backed by one SQLite pool.
pub fn sql_stores(pool: DbPool) -> WorkflowStores {
    WorkflowStores {
        actors: Arc::new(SqlActorRepository::new(pool.clone())),
        colleges: Arc::new(SqlCollegeRepository::new(pool.clone())),
        requests: Arc::new(SqlRequestRepository::new(pool.clone())),
        messages: Arc::new(SqlMessageRepository::new(pool)),
    }
}
