//! Tutor chat: a pluggable reply source plus the exchange record kept in
//! the session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::MAX_CHAT_MESSAGE_LENGTH;
use crate::errors::{AppError, AppResult};

/// What the tutor knows about the conversation.
#[derive(Debug, Clone, Default)]
pub struct TutorContext {
    pub student_name: String,
    pub subject_name: Option<String>,
}

/// Produces a reply for a student's message.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait Tutor: Send + Sync {
    fn reply(&self, message: &str, context: &TutorContext) -> String;
}

/// Deterministic keyword tutor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Greeting,
    Hint,
    Explain,
    Practice,
    Motivation,
    Other,
}

const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Hint, &["hint", "help", "stuck"]),
    (Intent::Explain, &["explain", "what is", "why", "how does"]),
    (Intent::Practice, &["practice", "quiz", "exercise", "test me"]),
    (Intent::Motivation, &["tired", "bored", "give up", "motivat", "hard"]),
    (Intent::Greeting, &["hello", "hi", "hey", "good morning"]),
];

fn classify(message: &str) -> Intent {
    let lower = message.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|k| {
                if k.contains(' ') || k.len() > 6 {
                    lower.contains(k)
                } else {
                    words.iter().any(|w| w.starts_with(k) && (w.len() == k.len() || k.len() > 3))
                }
            })
        })
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Other)
}

impl Tutor for RuleTutor {
    fn reply(&self, message: &str, context: &TutorContext) -> String {
        let topic = context
            .subject_name
            .as_deref()
            .map(|s| format!(" in {}", s))
            .unwrap_or_default();

        match classify(message) {
            Intent::Greeting => format!(
                "Hi {}! What would you like to work on{} today?",
                context.student_name, topic
            ),
            Intent::Hint => format!(
                "Try breaking the problem{} into smaller steps. Which step is giving you trouble?",
                topic
            ),
            Intent::Explain => format!(
                "Let's go through it together{}. Start with the part you already understand and tell me where it stops making sense.",
                topic
            ),
            Intent::Practice => format!(
                "Pick the next available node in your skill tree{} and try a short attempt. A score of 70% completes it.",
                topic
            ),
            Intent::Motivation => format!(
                "You're doing better than you think, {}. A few minutes of practice a day keeps your streak alive.",
                context.student_name
            ),
            Intent::Other => format!(
                "Good question{}. Can you tell me a bit more about what you are trying to solve?",
                topic
            ),
        }
    }
}

/// Trim and length-check an incoming message.
pub fn validate_message(message: &str) -> AppResult<&str> {
    let trimmed = message.trim();
    let length = trimmed.chars().count();
    if length == 0 {
        return Err(AppError::validation("Message cannot be empty"));
    }
    if length as u64 > MAX_CHAT_MESSAGE_LENGTH {
        return Err(AppError::validation(format!(
            "Message cannot exceed {} characters",
            MAX_CHAT_MESSAGE_LENGTH
        )));
    }
    Ok(trimmed)
}

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatExchange {
    pub id: Uuid,
    pub subject_id: Option<Uuid>,
    pub message: String,
    pub reply: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(subject: Option<&str>) -> TutorContext {
        TutorContext {
            student_name: "Mia".to_string(),
            subject_name: subject.map(str::to_string),
        }
    }

    #[test]
    fn classifies_keywords() {
        assert_eq!(classify("Hello there"), Intent::Greeting);
        assert_eq!(classify("I'm stuck, any hint?"), Intent::Hint);
        assert_eq!(classify("Can you explain fractions"), Intent::Explain);
        assert_eq!(classify("quiz me please"), Intent::Practice);
        assert_eq!(classify("this is so hard"), Intent::Motivation);
        assert_eq!(classify("photosynthesis"), Intent::Other);
        // "hi" must not match inside another word
        assert_eq!(classify("think"), Intent::Other);
    }

    #[test]
    fn replies_name_the_subject() {
        let reply = RuleTutor.reply("give me a hint", &ctx(Some("Algebra")));
        assert!(reply.contains("in Algebra"));

        let reply = RuleTutor.reply("hey", &ctx(None));
        assert!(reply.starts_with("Hi Mia!"));
    }

    #[test]
    fn message_length_bounds() {
        assert!(validate_message("   ").is_err());
        assert_eq!(validate_message("  ok ").unwrap(), "ok");
        let long = "a".repeat(MAX_CHAT_MESSAGE_LENGTH as usize + 1);
        assert!(validate_message(&long).is_err());
        let max = "a".repeat(MAX_CHAT_MESSAGE_LENGTH as usize);
        assert!(validate_message(&max).is_ok());
    }
}
