// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool, types::Json};
use uuid::Uuid;

use crate::{
    grading::{progress::aggregate_progress, score::final_score},
    models::{
        attempt::{Attempt, Enrollment, Evaluation},
        case_study::{CaseStudy, Exercise, Module, ModuleOutline},
        submission::{AnswerMap, GradingRecord, GradingResult, Submission},
        topic::{Question, Topic},
    },
    store::{CourseworkStore, StoreError, StoreResult},
};

const SUBMISSION_COLUMNS: &str =
    "id, topic_id, student_id, answers, status, version, created_at, updated_at, submitted_at";

const ATTEMPT_COLUMNS: &str =
    "id, exercise_id, student_id, attempt_number, response, evaluated_score, created_at, evaluated_at";

const ENROLLMENT_COLUMNS: &str =
    "id, case_study_id, student_id, final_score, completion_percentage, created_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Helper struct for locking an attempt together with its owner.
#[derive(FromRow)]
struct AttemptScope {
    student_id: Uuid,
    case_study_id: Uuid,
    evaluated_score: Option<f64>,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl CourseworkStore for PgStore {
    async fn create_topic(&self, title: &str) -> StoreResult<Topic> {
        let topic = sqlx::query_as::<_, Topic>(
            "INSERT INTO topics (id, title) VALUES ($1, $2) RETURNING id, title, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(topic)
    }

    async fn get_topic(&self, topic_id: Uuid) -> StoreResult<Option<Topic>> {
        let topic = sqlx::query_as::<_, Topic>("SELECT id, title, created_at FROM topics WHERE id = $1")
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(topic)
    }

    async fn create_question(
        &self,
        topic_id: Uuid,
        content: &str,
        answer_keys: &[String],
        order_number: i32,
    ) -> StoreResult<Question> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (id, topic_id, content, answer_keys, order_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, topic_id, content, answer_keys, order_number, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(topic_id)
        .bind(content)
        .bind(Json(answer_keys.to_vec()))
        .bind(order_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    async fn list_questions(&self, topic_id: Uuid) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, topic_id, content, answer_keys, order_number, created_at
            FROM questions
            WHERE topic_id = $1
            ORDER BY order_number, id
            "#,
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn get_submission(&self, topic_id: Uuid, student_id: Uuid) -> StoreResult<Option<Submission>> {
        let sql = format!(
            "SELECT {} FROM submissions WHERE topic_id = $1 AND student_id = $2",
            SUBMISSION_COLUMNS
        );
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(topic_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(submission)
    }

    async fn save_answers(
        &self,
        topic_id: Uuid,
        student_id: Uuid,
        answers: &AnswerMap,
    ) -> StoreResult<Submission> {
        // Upsert: every save after the first one is a new version.
        let sql = format!(
            r#"
            INSERT INTO submissions (id, topic_id, student_id, answers)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (topic_id, student_id) DO UPDATE SET
                answers = EXCLUDED.answers,
                status = 'in_progress',
                version = submissions.version + 1,
                updated_at = NOW(),
                submitted_at = NULL
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        );
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(Uuid::new_v4())
            .bind(topic_id)
            .bind(student_id)
            .bind(Json(answers))
            .fetch_one(&self.pool)
            .await?;

        Ok(submission)
    }

    async fn finalize_submission(
        &self,
        submission_id: Uuid,
        version: i32,
        result: GradingResult,
    ) -> StoreResult<GradingRecord> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i32> =
            sqlx::query_scalar("SELECT version FROM submissions WHERE id = $1 FOR UPDATE")
                .bind(submission_id)
                .fetch_optional(&mut *tx)
                .await?;

        match current {
            None => return Err(StoreError::NotFound("Submission")),
            Some(current) if current != version => {
                return Err(StoreError::Conflict(format!(
                    "Submission changed while grading (version {} is now {})",
                    version, current
                )));
            }
            Some(_) => {}
        }

        let GradingRecord {
            submission_id,
            submission_version,
            questions_attempted,
            questions_correct,
            questions_incorrect,
            questions_skipped,
            correct_answers,
            graded_at,
        } = GradingRecord::new(submission_id, version, result);

        // Latest grading pass supersedes any earlier one.
        let record = sqlx::query_as::<_, GradingRecord>(
            r#"
            INSERT INTO grading_results (
                submission_id, submission_version, questions_attempted, questions_correct,
                questions_incorrect, questions_skipped, correct_answers, graded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (submission_id) DO UPDATE SET
                submission_version = EXCLUDED.submission_version,
                questions_attempted = EXCLUDED.questions_attempted,
                questions_correct = EXCLUDED.questions_correct,
                questions_incorrect = EXCLUDED.questions_incorrect,
                questions_skipped = EXCLUDED.questions_skipped,
                correct_answers = EXCLUDED.correct_answers,
                graded_at = EXCLUDED.graded_at
            RETURNING
                submission_id, submission_version, questions_attempted, questions_correct,
                questions_incorrect, questions_skipped, correct_answers, graded_at
            "#,
        )
        .bind(submission_id)
        .bind(submission_version)
        .bind(questions_attempted)
        .bind(questions_correct)
        .bind(questions_incorrect)
        .bind(questions_skipped)
        .bind(correct_answers)
        .bind(graded_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE submissions SET status = 'submitted', submitted_at = NOW() WHERE id = $1")
            .bind(submission_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn get_grading_result(&self, submission_id: Uuid) -> StoreResult<Option<GradingRecord>> {
        let record = sqlx::query_as::<_, GradingRecord>(
            r#"
            SELECT
                submission_id, submission_version, questions_attempted, questions_correct,
                questions_incorrect, questions_skipped, correct_answers, graded_at
            FROM grading_results
            WHERE submission_id = $1
            "#,
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn create_case_study(&self, title: &str) -> StoreResult<CaseStudy> {
        let case_study = sqlx::query_as::<_, CaseStudy>(
            "INSERT INTO case_studies (id, title) VALUES ($1, $2) RETURNING id, title, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(case_study)
    }

    async fn get_case_study(&self, case_study_id: Uuid) -> StoreResult<Option<CaseStudy>> {
        let case_study =
            sqlx::query_as::<_, CaseStudy>("SELECT id, title, created_at FROM case_studies WHERE id = $1")
                .bind(case_study_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(case_study)
    }

    async fn create_module(&self, case_study_id: Uuid, title: &str, order_number: i32) -> StoreResult<Module> {
        let module = sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO modules (id, case_study_id, title, order_number)
            VALUES ($1, $2, $3, $4)
            RETURNING id, case_study_id, title, order_number, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(case_study_id)
        .bind(title)
        .bind(order_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(module)
    }

    async fn get_module(&self, module_id: Uuid) -> StoreResult<Option<Module>> {
        let module = sqlx::query_as::<_, Module>(
            "SELECT id, case_study_id, title, order_number, created_at FROM modules WHERE id = $1",
        )
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(module)
    }

    async fn create_exercise(
        &self,
        module_id: Uuid,
        title: &str,
        prompt: &str,
        order_number: i32,
    ) -> StoreResult<Exercise> {
        let exercise = sqlx::query_as::<_, Exercise>(
            r#"
            INSERT INTO exercises (id, module_id, title, prompt, order_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, module_id, title, prompt, order_number, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(module_id)
        .bind(title)
        .bind(prompt)
        .bind(order_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(exercise)
    }

    async fn get_exercise(&self, exercise_id: Uuid) -> StoreResult<Option<Exercise>> {
        let exercise = sqlx::query_as::<_, Exercise>(
            "SELECT id, module_id, title, prompt, order_number, created_at FROM exercises WHERE id = $1",
        )
        .bind(exercise_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(exercise)
    }

    async fn list_outline(&self, case_study_id: Uuid) -> StoreResult<Vec<ModuleOutline>> {
        let mut conn = self.pool.acquire().await?;
        fetch_outline(&mut *conn, case_study_id).await
    }

    async fn enroll(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Enrollment> {
        let sql = format!(
            "INSERT INTO enrollments (id, case_study_id, student_id) VALUES ($1, $2, $3) RETURNING {}",
            ENROLLMENT_COLUMNS
        );
        sqlx::query_as::<_, Enrollment>(&sql)
            .bind(Uuid::new_v4())
            .bind(case_study_id)
            .bind(student_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict("Student is already enrolled".to_string())
                } else {
                    StoreError::Database(e)
                }
            })
    }

    async fn get_enrollment(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let sql = format!(
            "SELECT {} FROM enrollments WHERE case_study_id = $1 AND student_id = $2",
            ENROLLMENT_COLUMNS
        );
        let enrollment = sqlx::query_as::<_, Enrollment>(&sql)
            .bind(case_study_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(enrollment)
    }

    async fn list_enrollments(
        &self,
        case_study_id: Uuid,
        after: Option<Uuid>,
        limit: i64,
    ) -> StoreResult<Vec<Enrollment>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM enrollments
            WHERE case_study_id = $1
              AND ($2::UUID IS NULL OR id > $2)
            ORDER BY id
            LIMIT $3
            "#,
            ENROLLMENT_COLUMNS
        );
        let page = sqlx::query_as::<_, Enrollment>(&sql)
            .bind(case_study_id)
            .bind(after)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(page)
    }

    async fn record_attempt(&self, exercise_id: Uuid, student_id: Uuid, response: &str) -> StoreResult<Attempt> {
        let mut tx = self.pool.begin().await?;

        let case_study_id: Uuid = sqlx::query_scalar(
            r#"
            SELECT m.case_study_id
            FROM exercises e
            JOIN modules m ON m.id = e.module_id
            WHERE e.id = $1
            "#,
        )
        .bind(exercise_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Exercise"))?;

        // Serializes attempts of one student so completion never goes stale.
        let enrollment_id: Uuid = sqlx::query_scalar(
            "SELECT id FROM enrollments WHERE case_study_id = $1 AND student_id = $2 FOR UPDATE",
        )
        .bind(case_study_id)
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Enrollment"))?;

        let sql = format!(
            r#"
            INSERT INTO attempts (id, exercise_id, student_id, attempt_number, response)
            SELECT $1, $2, $3, COALESCE(MAX(attempt_number), 0) + 1, $4
            FROM attempts
            WHERE exercise_id = $2 AND student_id = $3
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(Uuid::new_v4())
            .bind(exercise_id)
            .bind(student_id)
            .bind(response)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict("Another attempt was recorded concurrently".to_string())
                } else {
                    StoreError::Database(e)
                }
            })?;

        let outline = fetch_outline(&mut *tx, case_study_id).await?;
        let attempts = fetch_attempts(&mut *tx, case_study_id, student_id).await?;
        let summary = aggregate_progress(&outline, &attempts);

        sqlx::query("UPDATE enrollments SET completion_percentage = $1 WHERE id = $2")
            .bind(summary.completion_percentage)
            .bind(enrollment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(attempt)
    }

    async fn list_attempts(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Vec<Attempt>> {
        let mut conn = self.pool.acquire().await?;
        fetch_attempts(&mut *conn, case_study_id, student_id).await
    }

    async fn evaluate_attempt(&self, attempt_id: Uuid, score: f64) -> StoreResult<Evaluation> {
        let mut tx = self.pool.begin().await?;

        let scope = sqlx::query_as::<_, AttemptScope>(
            r#"
            SELECT a.student_id, m.case_study_id, a.evaluated_score
            FROM attempts a
            JOIN exercises e ON e.id = a.exercise_id
            JOIN modules m ON m.id = e.module_id
            WHERE a.id = $1
            FOR UPDATE OF a
            "#,
        )
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Attempt"))?;

        if scope.evaluated_score.is_some() {
            return Err(StoreError::AlreadyEvaluated(attempt_id));
        }

        let enrollment_id: Uuid = sqlx::query_scalar(
            "SELECT id FROM enrollments WHERE case_study_id = $1 AND student_id = $2 FOR UPDATE",
        )
        .bind(scope.case_study_id)
        .bind(scope.student_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Enrollment"))?;

        let sql = format!(
            "UPDATE attempts SET evaluated_score = $1, evaluated_at = NOW() WHERE id = $2 RETURNING {}",
            ATTEMPT_COLUMNS
        );
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(score)
            .bind(attempt_id)
            .fetch_one(&mut *tx)
            .await?;

        let scores: Vec<f64> = sqlx::query_scalar(
            r#"
            SELECT a.evaluated_score
            FROM attempts a
            JOIN exercises e ON e.id = a.exercise_id
            JOIN modules m ON m.id = e.module_id
            WHERE m.case_study_id = $1
              AND a.student_id = $2
              AND a.evaluated_score IS NOT NULL
            "#,
        )
        .bind(scope.case_study_id)
        .bind(scope.student_id)
        .fetch_all(&mut *tx)
        .await?;

        let final_score = final_score(scores);

        sqlx::query("UPDATE enrollments SET final_score = $1 WHERE id = $2")
            .bind(final_score)
            .bind(enrollment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt_id,
            student_id = %scope.student_id,
            final_score,
            "Attempt evaluated"
        );

        Ok(Evaluation { attempt, final_score })
    }
}

async fn fetch_outline(conn: &mut PgConnection, case_study_id: Uuid) -> StoreResult<Vec<ModuleOutline>> {
    let modules = sqlx::query_as::<_, Module>(
        r#"
        SELECT id, case_study_id, title, order_number, created_at
        FROM modules
        WHERE case_study_id = $1
        ORDER BY order_number, id
        "#,
    )
    .bind(case_study_id)
    .fetch_all(&mut *conn)
    .await?;

    let exercises = sqlx::query_as::<_, Exercise>(
        r#"
        SELECT e.id, e.module_id, e.title, e.prompt, e.order_number, e.created_at
        FROM exercises e
        JOIN modules m ON m.id = e.module_id
        WHERE m.case_study_id = $1
        ORDER BY e.order_number, e.id
        "#,
    )
    .bind(case_study_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut outline: Vec<ModuleOutline> = modules
        .into_iter()
        .map(|module| ModuleOutline {
            module,
            exercises: Vec::new(),
        })
        .collect();

    for exercise in exercises {
        if let Some(entry) = outline.iter_mut().find(|o| o.module.id == exercise.module_id) {
            entry.exercises.push(exercise);
        }
    }

    Ok(outline)
}

async fn fetch_attempts(conn: &mut PgConnection, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Vec<Attempt>> {
    let attempts = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT
            a.id, a.exercise_id, a.student_id, a.attempt_number, a.response,
            a.evaluated_score, a.created_at, a.evaluated_at
        FROM attempts a
        JOIN exercises e ON e.id = a.exercise_id
        JOIN modules m ON m.id = e.module_id
        WHERE m.case_study_id = $1 AND a.student_id = $2
        ORDER BY a.created_at
        "#,
    )
    .bind(case_study_id)
    .bind(student_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(attempts)
}
