// src/handlers/topic.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::topic::{CreateQuestionRequest, CreateTopicRequest, PublicQuestion},
    store::DynStore,
};

pub async fn create_topic(
    State(store): State<DynStore>,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let topic = store.create_topic(&payload.title).await?;

    Ok((StatusCode::CREATED, Json(topic)))
}

pub async fn get_topic(
    State(store): State<DynStore>,
    Path(topic_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let topic = store
        .get_topic(topic_id)
        .await?
        .ok_or(AppError::NotFound("Topic not found".to_string()))?;

    Ok(Json(topic))
}

/// Adds a question with its answer key set to a topic.
pub async fn create_question(
    State(store): State<DynStore>,
    Path(topic_id): Path<Uuid>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    store
        .get_topic(topic_id)
        .await?
        .ok_or(AppError::NotFound("Topic not found".to_string()))?;

    let question = store
        .create_question(
            topic_id,
            &payload.content,
            &payload.answer_keys,
            payload.order_number,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Lists a topic's questions for students, in order and without answer keys.
pub async fn list_questions(
    State(store): State<DynStore>,
    Path(topic_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    store
        .get_topic(topic_id)
        .await?
        .ok_or(AppError::NotFound("Topic not found".to_string()))?;

    let questions: Vec<PublicQuestion> = store
        .list_questions(topic_id)
        .await?
        .into_iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(questions))
}
