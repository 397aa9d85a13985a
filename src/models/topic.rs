// src/models/topic.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

/// Represents the 'topics' table: a graded set of questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub topic_id: Uuid,

    /// The text content of the question.
    pub content: String,

    /// The authoritative set of correct answer keys at grading time.
    /// Stored as a JSON array in the database.
    pub answer_keys: Json<Vec<String>>,

    /// Position within the topic, ascending.
    pub order_number: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to students (excludes answer keys).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: Uuid,
    pub content: String,
    pub order_number: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            content: q.content,
            order_number: q.order_number,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_answer_keys))]
    pub answer_keys: Vec<String>,
    #[validate(range(min = 0))]
    pub order_number: i32,
}

fn validate_answer_keys(keys: &[String]) -> Result<(), validator::ValidationError> {
    if keys.is_empty() {
        return Err(validator::ValidationError::new("answer_keys_cannot_be_empty"));
    }
    let mut seen = HashSet::new();
    for key in keys {
        if key.is_empty() || key.len() > 200 {
            return Err(validator::ValidationError::new("answer_key_length"));
        }
        if !seen.insert(key.as_str()) {
            return Err(validator::ValidationError::new("duplicate_answer_key"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(keys: &[&str]) -> CreateQuestionRequest {
        CreateQuestionRequest {
            content: "Which statements are true?".to_string(),
            answer_keys: keys.iter().map(|k| k.to_string()).collect(),
            order_number: 1,
        }
    }

    #[test]
    fn test_question_request_accepts_unique_keys() {
        assert!(request(&["a", "b"]).validate().is_ok());
    }

    #[test]
    fn test_question_request_rejects_empty_keys() {
        assert!(request(&[]).validate().is_err());
    }

    #[test]
    fn test_question_request_rejects_duplicate_keys() {
        assert!(request(&["a", "a"]).validate().is_err());
    }
}
