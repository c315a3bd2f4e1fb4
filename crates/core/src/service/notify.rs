use crate::domain::message::{EntityRef, Message, MessageKind};
use crate::domain::request::{OverallStatus, Request};
use crate::flows::TransitionRecord;

/// Builds the system message a transition produces, if any.
///
/// An opened step notifies its assignee; a terminal decision notifies the
/// submitter. The sender is whoever caused the transition.
pub fn transition_notice(request: &Request, record: &TransitionRecord) -> Option<Message> {
    let sender = record.acted_by.clone().unwrap_or_else(|| request.submitter_id.clone());
    let entity = Some(EntityRef::request(&request.id, request.kind().as_str()));
    let label = request.kind().as_str().replace('_', " ");

    if let Some(next) = &record.next_step {
        let receiver = next.assignee.clone()?;
        let content = format!(
            "A {label} ({}) awaits your decision as {}.",
            request.id, next.role
        );
        return Some(Message::new(sender, receiver, content, MessageKind::System, entity));
    }

    let verdict = match record.to {
        OverallStatus::Approved => "approved",
        OverallStatus::Rejected => "rejected",
        OverallStatus::Draft | OverallStatus::InProgress => return None,
    };
    let content = format!("Your {label} ({}) was {verdict}.", request.id);
    Some(Message::new(sender, request.submitter_id.clone(), content, MessageKind::System, entity))
}
