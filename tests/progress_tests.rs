// tests/progress_tests.rs

use std::sync::Arc;

use coursework::{config::Config, routes, state::AppState, store::MemoryStore};
use serde_json::{Value, json};

async fn spawn_app() -> String {
    let config = Config {
        database_url: None,
        port: 0,
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        cors_origins: vec![],
    };

    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        config,
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json::<Value>().await.unwrap_or(Value::Null))
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

/// Case study with modules of 3 and 2 exercises; returns (case study id, exercise ids in order).
async fn seed_case_study(client: &reqwest::Client, address: &str) -> (String, Vec<String>) {
    let (_, case_study) = post(client, format!("{}/api/case-studies", address), json!({ "title": "Retail" })).await;
    let case_study_id = id(&case_study);

    // Second module first: order numbers, not creation order, decide.
    let (_, m2) = post(
        client,
        format!("{}/api/case-studies/{}/modules", address, case_study_id),
        json!({ "title": "Pricing", "orderNumber": 2 }),
    )
    .await;
    let (_, m1) = post(
        client,
        format!("{}/api/case-studies/{}/modules", address, case_study_id),
        json!({ "title": "Market", "orderNumber": 1 }),
    )
    .await;

    let mut exercises = Vec::new();
    for (module, count) in [(&m1, 3), (&m2, 2)] {
        for n in 1..=count {
            let (status, exercise) = post(
                client,
                format!("{}/api/modules/{}/exercises", address, id(module)),
                json!({ "title": format!("Exercise {}", n), "prompt": "Explain", "orderNumber": n }),
            )
            .await;
            assert_eq!(status, 201);
            exercises.push(id(&exercise));
        }
    }

    (case_study_id, exercises)
}

#[tokio::test]
async fn test_progress_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (case_study_id, exercises) = seed_case_study(&client, &address).await;
    let student = uuid::Uuid::new_v4().to_string();

    // 1. Enroll
    let (status, _) = post(
        &client,
        format!("{}/api/case-studies/{}/enrollments", address, case_study_id),
        json!({ "studentId": student }),
    )
    .await;
    assert_eq!(status, 201);

    // 2. Attempt the first two exercises of module 1
    let mut attempts = Vec::new();
    for exercise in &exercises[..2] {
        let (status, attempt) = post(
            &client,
            format!("{}/api/exercises/{}/attempts", address, exercise),
            json!({ "studentId": student, "response": "My answer" }),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(attempt["attemptNumber"], 1);
        attempts.push(id(&attempt));
    }

    let progress_url = format!(
        "{}/api/case-studies/{}/students/{}/progress",
        address, case_study_id, student
    );
    let progress: Value = client.get(&progress_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(progress["totalExercises"], 5);
    assert_eq!(progress["attemptedExercises"], 2);
    assert_eq!(progress["completionPercentage"], 40);
    assert_eq!(progress["currentPosition"]["kind"], "next");
    assert_eq!(progress["currentPosition"]["exerciseId"], exercises[2].as_str());
    assert_eq!(progress["finalScore"], 0.0);

    // 3. Evaluate both attempts
    for (attempt, score) in attempts.iter().zip([4.0, 5.0]) {
        let (status, _) = post(
            &client,
            format!("{}/api/attempts/{}/evaluation", address, attempt),
            json!({ "evaluatedScore": score }),
        )
        .await;
        assert_eq!(status, 200);
    }

    // 4. Re-evaluation is rejected and changes nothing
    let (status, _) = post(
        &client,
        format!("{}/api/attempts/{}/evaluation", address, attempts[0]),
        json!({ "evaluatedScore": 1.0 }),
    )
    .await;
    assert_eq!(status, 409);

    let progress: Value = client.get(&progress_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(progress["finalScore"], 4.5);
}

#[tokio::test]
async fn test_evaluation_out_of_range_is_400() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (status, _) = post(
        &client,
        format!("{}/api/attempts/{}/evaluation", address, uuid::Uuid::new_v4()),
        json!({ "evaluatedScore": -3 }),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_attempt_without_enrollment_is_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, exercises) = seed_case_study(&client, &address).await;

    let (status, _) = post(
        &client,
        format!("{}/api/exercises/{}/attempts", address, exercises[0]),
        json!({ "studentId": uuid::Uuid::new_v4(), "response": "Hi" }),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_duplicate_enrollment_is_409() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (case_study_id, _) = seed_case_study(&client, &address).await;
    let url = format!("{}/api/case-studies/{}/enrollments", address, case_study_id);
    let body = json!({ "studentId": uuid::Uuid::new_v4() });

    let (first, _) = post(&client, url.clone(), body.clone()).await;
    let (second, _) = post(&client, url, body).await;
    assert_eq!(first, 201);
    assert_eq!(second, 409);
}

#[tokio::test]
async fn test_class_progress_pages() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (case_study_id, _) = seed_case_study(&client, &address).await;

    for _ in 0..3 {
        post(
            &client,
            format!("{}/api/case-studies/{}/enrollments", address, case_study_id),
            json!({ "studentId": uuid::Uuid::new_v4() }),
        )
        .await;
    }

    let base = format!("{}/api/case-studies/{}/progress", address, case_study_id);
    let first: Value = client
        .get(format!("{}?limit=2", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    let cursor = first["nextCursor"].as_str().expect("expected another page");

    let second: Value = client
        .get(format!("{}?limit=2&cursor={}", base, cursor))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert!(second["nextCursor"].is_null());
    assert_eq!(second["items"][0]["totalExercises"], 5);
}

#[tokio::test]
async fn test_outline_is_ordered() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (case_study_id, exercises) = seed_case_study(&client, &address).await;

    let outline: Vec<Value> = client
        .get(format!("{}/api/case-studies/{}/outline", address, case_study_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0]["title"], "Market");
    assert_eq!(outline[0]["exercises"][0]["id"], exercises[0].as_str());
    assert_eq!(outline[1]["exercises"].as_array().unwrap().len(), 2);
}
