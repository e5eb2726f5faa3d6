//! Tutor chat replies. History lives in the session cache and is handled
//! at the API layer.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::access::school_subject;
use crate::domain::chat::validate_message;
use crate::domain::{Actor, ChatExchange, Tutor, TutorContext};
use crate::errors::{AppResult, OptionExt};
use crate::infra::UnitOfWork;

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Answer a message, optionally about one subject
    async fn send_message(&self, actor: Actor, message: String, subject_id: Option<Uuid>) -> AppResult<ChatExchange>;
}

pub struct ChatManager<U: UnitOfWork> {
    uow: Arc<U>,
    tutor: Arc<dyn Tutor>,
}

impl<U: UnitOfWork> ChatManager<U> {
    pub fn new(uow: Arc<U>, tutor: Arc<dyn Tutor>) -> Self {
        Self { uow, tutor }
    }
}

pub fn history_key(user_id: Uuid) -> String {
    format!("chat:{}", user_id)
}

#[async_trait]
impl<U: UnitOfWork> ChatService for ChatManager<U> {
    async fn send_message(&self, actor: Actor, message: String, subject_id: Option<Uuid>) -> AppResult<ChatExchange> {
        let message = validate_message(&message)?.to_string();

        let user = self.uow.users().find_by_id(actor.id).await?.ok_or_not_found()?;
        let subject_name = match subject_id {
            Some(id) => Some(school_subject(self.uow.as_ref(), &actor, id).await?.name),
            None => None,
        };

        let context = TutorContext {
            student_name: user.name,
            subject_name,
        };
        let reply = self.tutor.reply(&message, &context);

        tracing::debug!(user_id = %actor.id, "Tutor replied");
        Ok(ChatExchange {
            id: Uuid::new_v4(),
            subject_id,
            message,
            reply,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keys_are_per_user() {
        let id = Uuid::new_v4();
        assert_eq!(history_key(id), format!("chat:{}", id));
    }
}
