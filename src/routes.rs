// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{case_study, progress, submission, topic},
    state::AppState,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (topics, submissions, case studies, progress).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store and config).
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let topic_routes = Router::new()
        .route("/", post(topic::create_topic))
        .route("/{topic_id}", get(topic::get_topic))
        .route(
            "/{topic_id}/questions",
            get(topic::list_questions).post(topic::create_question),
        );

    let student_routes = Router::new()
        .route(
            "/{student_id}/topics/{topic_id}/submission",
            get(submission::get_submission).put(submission::save_answers),
        )
        .route(
            "/{student_id}/topics/{topic_id}/submission/submit",
            post(submission::submit),
        );

    let case_study_routes = Router::new()
        .route("/", post(case_study::create_case_study))
        .route("/{case_study_id}/modules", post(case_study::create_module))
        .route("/{case_study_id}/outline", get(case_study::get_outline))
        .route("/{case_study_id}/enrollments", post(case_study::enroll))
        .route("/{case_study_id}/progress", get(progress::class_progress))
        .route(
            "/{case_study_id}/students/{student_id}/progress",
            get(progress::student_progress),
        );

    Router::new()
        .nest("/api/topics", topic_routes)
        .nest("/api/students", student_routes)
        .nest("/api/case-studies", case_study_routes)
        .route(
            "/api/submissions/{submission_id}/result",
            get(submission::get_result),
        )
        .route(
            "/api/modules/{module_id}/exercises",
            post(case_study::create_exercise),
        )
        .route(
            "/api/exercises/{exercise_id}/attempts",
            post(progress::record_attempt),
        )
        .route(
            "/api/attempts/{attempt_id}/evaluation",
            post(progress::evaluate_attempt),
        )
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
