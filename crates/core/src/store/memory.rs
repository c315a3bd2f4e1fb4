use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::actor::{Actor, ActorId};
use crate::domain::college::College;
use crate::domain::message::Message;
use crate::domain::request::{OverallStatus, Request, RequestId};

use super::{ActorStore, CollegeStore, MessageStore, RequestStore, StoreError};

#[derive(Default)]
pub struct InMemoryActorStore {
    actors: RwLock<HashMap<String, Actor>>,
}

#[async_trait::async_trait]
impl ActorStore for InMemoryActorStore {
    async fn find(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        let actors = self.actors.read().await;
        Ok(actors.get(&id.0).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Actor>, StoreError> {
        let actors = self.actors.read().await;
        Ok(actors.values().find(|actor| actor.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn insert(&self, actor: Actor) -> Result<(), StoreError> {
        let mut actors = self.actors.write().await;
        if actors.contains_key(&actor.id.0) {
            return Err(StoreError::Duplicate(format!("actor id `{}`", actor.id)));
        }
        if actors.values().any(|existing| existing.email.eq_ignore_ascii_case(&actor.email)) {
            return Err(StoreError::Duplicate(format!("actor email `{}`", actor.email)));
        }
        actors.insert(actor.id.0.clone(), actor);
        Ok(())
    }

    async fn update(&self, actor: Actor) -> Result<(), StoreError> {
        let mut actors = self.actors.write().await;
        if let Some(seat) = actor.seat().filter(|_| actor.is_approved()) {
            let taken = actors.values().any(|held| {
                held.id != actor.id && held.is_approved() && held.seat().as_ref() == Some(&seat)
            });
            if taken {
                return Err(StoreError::Duplicate(format!("{seat} is already held")));
            }
        }
        match actors.get_mut(&actor.id.0) {
            Some(existing) => {
                *existing = actor;
                Ok(())
            }
            None => Err(StoreError::Backend(format!("actor `{}` does not exist", actor.id))),
        }
    }

    async fn list_by_college(&self, college: &str) -> Result<Vec<Actor>, StoreError> {
        let actors = self.actors.read().await;
        let mut members: Vec<Actor> =
            actors.values().filter(|actor| actor.belongs_to_college(college)).cloned().collect();
        members.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(members)
    }
}

#[derive(Default)]
pub struct InMemoryCollegeStore {
    colleges: RwLock<HashMap<String, College>>,
}

#[async_trait::async_trait]
impl CollegeStore for InMemoryCollegeStore {
    async fn find(&self, name: &str) -> Result<Option<College>, StoreError> {
        let colleges = self.colleges.read().await;
        Ok(colleges.get(name).cloned())
    }

    async fn insert(&self, college: College) -> Result<(), StoreError> {
        let mut colleges = self.colleges.write().await;
        if colleges.contains_key(&college.name) {
            return Err(StoreError::Duplicate(format!("college `{}`", college.name)));
        }
        colleges.insert(college.name.clone(), college);
        Ok(())
    }

    async fn update(&self, college: College) -> Result<(), StoreError> {
        let mut colleges = self.colleges.write().await;
        match colleges.get_mut(&college.name) {
            Some(existing) => {
                *existing = college;
                Ok(())
            }
            None => Err(StoreError::Backend(format!("college `{}` does not exist", college.name))),
        }
    }

    async fn find_by_principal(&self, principal: &ActorId) -> Result<Option<College>, StoreError> {
        let colleges = self.colleges.read().await;
        Ok(colleges.values().find(|college| &college.principal_id == principal).cloned())
    }

    async fn list(&self) -> Result<Vec<College>, StoreError> {
        let colleges = self.colleges.read().await;
        let mut all: Vec<College> = colleges.values().cloned().collect();
        all.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<String, Request>>,
}

#[async_trait::async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: Request) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id.0) {
            return Err(StoreError::Duplicate(format!("request `{}`", request.id)));
        }
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find(&self, id: &RequestId) -> Result<Option<Request>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn commit(&self, request: Request, expected_version: u32) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        let Some(stored) = requests.get_mut(&request.id.0) else {
            return Err(StoreError::Backend(format!("request `{}` does not exist", request.id)));
        };
        if stored.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "request `{}` is at version {}, expected {expected_version}",
                request.id, stored.version
            )));
        }
        *stored = request;
        Ok(())
    }

    async fn list_by_submitter(&self, submitter: &ActorId) -> Result<Vec<Request>, StoreError> {
        let requests = self.requests.read().await;
        let mut owned: Vec<Request> = requests
            .values()
            .filter(|request| &request.submitter_id == submitter)
            .cloned()
            .collect();
        owned.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(owned)
    }

    async fn list_open_in_college(&self, college: &str) -> Result<Vec<Request>, StoreError> {
        let requests = self.requests.read().await;
        let mut open: Vec<Request> = requests
            .values()
            .filter(|request| {
                request.status == OverallStatus::InProgress && request.scope.college == college
            })
            .cloned()
            .collect();
        open.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(open)
    }
}

#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<Message>>,
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: Message) -> Result<(), StoreError> {
        let mut messages = self.messages.write().await;
        messages.push(message);
        Ok(())
    }

    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Message>, StoreError> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|message| {
                message.entity.as_ref().is_some_and(|entity| entity.entity_id == entity_id)
            })
            .cloned()
            .collect())
    }

    async fn list_for_receiver(&self, receiver: &ActorId) -> Result<Vec<Message>, StoreError> {
        let messages = self.messages.read().await;
        Ok(messages.iter().filter(|message| &message.receiver == receiver).cloned().collect())
    }
}
