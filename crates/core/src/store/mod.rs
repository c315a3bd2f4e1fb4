//! Persistence ports consumed by the workflow service.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::actor::{Actor, ActorId};
use crate::domain::college::College;
use crate::domain::message::Message;
use crate::domain::request::{Request, RequestId};

pub mod memory;

pub use memory::{InMemoryActorStore, InMemoryCollegeStore, InMemoryMessageStore, InMemoryRequestStore};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A compare-and-swap commit lost against a concurrent writer.
    #[error("version conflict: {0}")]
    Conflict(String),
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ActorStore: Send + Sync {
    async fn find(&self, id: &ActorId) -> Result<Option<Actor>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Actor>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the id or email is taken.
    async fn insert(&self, actor: Actor) -> Result<(), StoreError>;
    async fn update(&self, actor: Actor) -> Result<(), StoreError>;
    async fn list_by_college(&self, college: &str) -> Result<Vec<Actor>, StoreError>;
}

#[async_trait]
pub trait CollegeStore: Send + Sync {
    async fn find(&self, name: &str) -> Result<Option<College>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the name is taken.
    async fn insert(&self, college: College) -> Result<(), StoreError>;
    /// Replaces the details and department list of the college with the same name.
    async fn update(&self, college: College) -> Result<(), StoreError>;
    async fn find_by_principal(&self, principal: &ActorId) -> Result<Option<College>, StoreError>;
    async fn list(&self) -> Result<Vec<College>, StoreError>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: Request) -> Result<(), StoreError>;
    async fn find(&self, id: &RequestId) -> Result<Option<Request>, StoreError>;
    /// Replaces the stored request only if its version still equals `expected_version`.
    async fn commit(&self, request: Request, expected_version: u32) -> Result<(), StoreError>;
    async fn list_by_submitter(&self, submitter: &ActorId) -> Result<Vec<Request>, StoreError>;
    /// In-progress requests whose scope belongs to `college`.
    async fn list_open_in_college(&self, college: &str) -> Result<Vec<Request>, StoreError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: Message) -> Result<(), StoreError>;
    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Message>, StoreError>;
    async fn list_for_receiver(&self, receiver: &ActorId) -> Result<Vec<Message>, StoreError>;
}
