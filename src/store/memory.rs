// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    grading::{progress::aggregate_progress, score::final_score},
    models::{
        attempt::{Attempt, Enrollment, Evaluation},
        case_study::{CaseStudy, Exercise, Module, ModuleOutline},
        submission::{AnswerMap, GradingRecord, GradingResult, Submission, SubmissionStatus},
        topic::{Question, Topic},
    },
    store::{CourseworkStore, StoreError, StoreResult},
};

#[derive(Default)]
struct Tables {
    topics: HashMap<Uuid, Topic>,
    questions: Vec<Question>,
    submissions: HashMap<Uuid, Submission>,
    grading_results: HashMap<Uuid, GradingRecord>,
    case_studies: HashMap<Uuid, CaseStudy>,
    modules: HashMap<Uuid, Module>,
    exercises: HashMap<Uuid, Exercise>,
    enrollments: HashMap<Uuid, Enrollment>,
    attempts: HashMap<Uuid, Attempt>,
}

impl Tables {
    /// Case study an exercise belongs to, via its module.
    fn case_study_of(&self, exercise_id: Uuid) -> Option<Uuid> {
        let exercise = self.exercises.get(&exercise_id)?;
        self.modules.get(&exercise.module_id).map(|m| m.case_study_id)
    }

    fn enrollment_id(&self, case_study_id: Uuid, student_id: Uuid) -> Option<Uuid> {
        self.enrollments
            .values()
            .find(|e| e.case_study_id == case_study_id && e.student_id == student_id)
            .map(|e| e.id)
    }

    fn outline(&self, case_study_id: Uuid) -> Vec<ModuleOutline> {
        let mut modules: Vec<&Module> = self
            .modules
            .values()
            .filter(|m| m.case_study_id == case_study_id)
            .collect();
        modules.sort_by_key(|m| (m.order_number, m.id));

        modules
            .into_iter()
            .map(|module| {
                let mut exercises: Vec<Exercise> = self
                    .exercises
                    .values()
                    .filter(|e| e.module_id == module.id)
                    .cloned()
                    .collect();
                exercises.sort_by_key(|e| (e.order_number, e.id));
                ModuleOutline {
                    module: module.clone(),
                    exercises,
                }
            })
            .collect()
    }

    fn attempts_of(&self, case_study_id: Uuid, student_id: Uuid) -> Vec<Attempt> {
        let mut attempts: Vec<Attempt> = self
            .attempts
            .values()
            .filter(|a| a.student_id == student_id)
            .filter(|a| self.case_study_of(a.exercise_id) == Some(case_study_id))
            .cloned()
            .collect();
        attempts.sort_by_key(|a| (a.created_at, a.id));
        attempts
    }
}

/// In-process store used when no database is configured, and by tests.
///
/// A single lock guards all tables, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseworkStore for MemoryStore {
    async fn create_topic(&self, title: &str) -> StoreResult<Topic> {
        let topic = Topic {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.tables.lock().await.topics.insert(topic.id, topic.clone());
        Ok(topic)
    }

    async fn get_topic(&self, topic_id: Uuid) -> StoreResult<Option<Topic>> {
        Ok(self.tables.lock().await.topics.get(&topic_id).cloned())
    }

    async fn create_question(
        &self,
        topic_id: Uuid,
        content: &str,
        answer_keys: &[String],
        order_number: i32,
    ) -> StoreResult<Question> {
        let mut tables = self.tables.lock().await;
        if !tables.topics.contains_key(&topic_id) {
            return Err(StoreError::NotFound("Topic"));
        }

        let question = Question {
            id: Uuid::new_v4(),
            topic_id,
            content: content.to_string(),
            answer_keys: Json(answer_keys.to_vec()),
            order_number,
            created_at: Utc::now(),
        };
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn list_questions(&self, topic_id: Uuid) -> StoreResult<Vec<Question>> {
        let tables = self.tables.lock().await;
        let mut questions: Vec<Question> = tables
            .questions
            .iter()
            .filter(|q| q.topic_id == topic_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.order_number, q.id));
        Ok(questions)
    }

    async fn get_submission(&self, topic_id: Uuid, student_id: Uuid) -> StoreResult<Option<Submission>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .submissions
            .values()
            .find(|s| s.topic_id == topic_id && s.student_id == student_id)
            .cloned())
    }

    async fn save_answers(
        &self,
        topic_id: Uuid,
        student_id: Uuid,
        answers: &AnswerMap,
    ) -> StoreResult<Submission> {
        let mut tables = self.tables.lock().await;
        if !tables.topics.contains_key(&topic_id) {
            return Err(StoreError::NotFound("Topic"));
        }

        let now = Utc::now();
        let existing = tables
            .submissions
            .values_mut()
            .find(|s| s.topic_id == topic_id && s.student_id == student_id);

        let submission = match existing {
            Some(submission) => {
                submission.answers = Json(answers.clone());
                submission.status = SubmissionStatus::InProgress;
                submission.version += 1;
                submission.updated_at = now;
                submission.submitted_at = None;
                submission.clone()
            }
            None => {
                let submission = Submission {
                    id: Uuid::new_v4(),
                    topic_id,
                    student_id,
                    answers: Json(answers.clone()),
                    status: SubmissionStatus::InProgress,
                    version: 1,
                    created_at: now,
                    updated_at: now,
                    submitted_at: None,
                };
                tables.submissions.insert(submission.id, submission.clone());
                submission
            }
        };
        Ok(submission)
    }

    async fn finalize_submission(
        &self,
        submission_id: Uuid,
        version: i32,
        result: GradingResult,
    ) -> StoreResult<GradingRecord> {
        let mut tables = self.tables.lock().await;
        let submission = tables
            .submissions
            .get_mut(&submission_id)
            .ok_or(StoreError::NotFound("Submission"))?;

        if submission.version != version {
            return Err(StoreError::Conflict(format!(
                "Submission changed while grading (version {} is now {})",
                version, submission.version
            )));
        }

        let record = GradingRecord::new(submission_id, version, result);
        submission.status = SubmissionStatus::Submitted;
        submission.submitted_at = Some(record.graded_at);
        tables.grading_results.insert(submission_id, record.clone());
        Ok(record)
    }

    async fn get_grading_result(&self, submission_id: Uuid) -> StoreResult<Option<GradingRecord>> {
        Ok(self.tables.lock().await.grading_results.get(&submission_id).cloned())
    }

    async fn create_case_study(&self, title: &str) -> StoreResult<CaseStudy> {
        let case_study = CaseStudy {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .await
            .case_studies
            .insert(case_study.id, case_study.clone());
        Ok(case_study)
    }

    async fn get_case_study(&self, case_study_id: Uuid) -> StoreResult<Option<CaseStudy>> {
        Ok(self.tables.lock().await.case_studies.get(&case_study_id).cloned())
    }

    async fn create_module(&self, case_study_id: Uuid, title: &str, order_number: i32) -> StoreResult<Module> {
        let mut tables = self.tables.lock().await;
        if !tables.case_studies.contains_key(&case_study_id) {
            return Err(StoreError::NotFound("Case study"));
        }

        let module = Module {
            id: Uuid::new_v4(),
            case_study_id,
            title: title.to_string(),
            order_number,
            created_at: Utc::now(),
        };
        tables.modules.insert(module.id, module.clone());
        Ok(module)
    }

    async fn get_module(&self, module_id: Uuid) -> StoreResult<Option<Module>> {
        Ok(self.tables.lock().await.modules.get(&module_id).cloned())
    }

    async fn create_exercise(
        &self,
        module_id: Uuid,
        title: &str,
        prompt: &str,
        order_number: i32,
    ) -> StoreResult<Exercise> {
        let mut tables = self.tables.lock().await;
        if !tables.modules.contains_key(&module_id) {
            return Err(StoreError::NotFound("Module"));
        }

        let exercise = Exercise {
            id: Uuid::new_v4(),
            module_id,
            title: title.to_string(),
            prompt: prompt.to_string(),
            order_number,
            created_at: Utc::now(),
        };
        tables.exercises.insert(exercise.id, exercise.clone());
        Ok(exercise)
    }

    async fn get_exercise(&self, exercise_id: Uuid) -> StoreResult<Option<Exercise>> {
        Ok(self.tables.lock().await.exercises.get(&exercise_id).cloned())
    }

    async fn list_outline(&self, case_study_id: Uuid) -> StoreResult<Vec<ModuleOutline>> {
        Ok(self.tables.lock().await.outline(case_study_id))
    }

    async fn enroll(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Enrollment> {
        let mut tables = self.tables.lock().await;
        if !tables.case_studies.contains_key(&case_study_id) {
            return Err(StoreError::NotFound("Case study"));
        }
        if tables.enrollment_id(case_study_id, student_id).is_some() {
            return Err(StoreError::Conflict("Student is already enrolled".to_string()));
        }

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            case_study_id,
            student_id,
            final_score: 0.0,
            completion_percentage: 0,
            created_at: Utc::now(),
        };
        tables.enrollments.insert(enrollment.id, enrollment.clone());
        Ok(enrollment)
    }

    async fn get_enrollment(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .enrollment_id(case_study_id, student_id)
            .and_then(|id| tables.enrollments.get(&id).cloned()))
    }

    async fn list_enrollments(
        &self,
        case_study_id: Uuid,
        after: Option<Uuid>,
        limit: i64,
    ) -> StoreResult<Vec<Enrollment>> {
        let tables = self.tables.lock().await;
        let mut page: Vec<Enrollment> = tables
            .enrollments
            .values()
            .filter(|e| e.case_study_id == case_study_id)
            .filter(|e| after.is_none_or(|cursor| e.id > cursor))
            .cloned()
            .collect();
        page.sort_by_key(|e| e.id);
        page.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(page)
    }

    async fn record_attempt(&self, exercise_id: Uuid, student_id: Uuid, response: &str) -> StoreResult<Attempt> {
        let mut tables = self.tables.lock().await;
        let case_study_id = tables
            .case_study_of(exercise_id)
            .ok_or(StoreError::NotFound("Exercise"))?;
        let enrollment_id = tables
            .enrollment_id(case_study_id, student_id)
            .ok_or(StoreError::NotFound("Enrollment"))?;

        let previous = tables
            .attempts
            .values()
            .filter(|a| a.exercise_id == exercise_id && a.student_id == student_id)
            .map(|a| a.attempt_number)
            .max()
            .unwrap_or(0);

        let attempt = Attempt {
            id: Uuid::new_v4(),
            exercise_id,
            student_id,
            attempt_number: previous + 1,
            response: response.to_string(),
            evaluated_score: None,
            created_at: Utc::now(),
            evaluated_at: None,
        };
        tables.attempts.insert(attempt.id, attempt.clone());

        let summary = aggregate_progress(
            &tables.outline(case_study_id),
            &tables.attempts_of(case_study_id, student_id),
        );
        if let Some(enrollment) = tables.enrollments.get_mut(&enrollment_id) {
            enrollment.completion_percentage = summary.completion_percentage;
        }
        Ok(attempt)
    }

    async fn list_attempts(&self, case_study_id: Uuid, student_id: Uuid) -> StoreResult<Vec<Attempt>> {
        Ok(self.tables.lock().await.attempts_of(case_study_id, student_id))
    }

    async fn evaluate_attempt(&self, attempt_id: Uuid, score: f64) -> StoreResult<Evaluation> {
        let mut tables = self.tables.lock().await;

        let attempt = tables
            .attempts
            .get(&attempt_id)
            .ok_or(StoreError::NotFound("Attempt"))?;
        if attempt.evaluated_score.is_some() {
            return Err(StoreError::AlreadyEvaluated(attempt_id));
        }

        let student_id = attempt.student_id;
        let case_study_id = tables
            .case_study_of(attempt.exercise_id)
            .ok_or(StoreError::NotFound("Exercise"))?;
        let enrollment_id = tables
            .enrollment_id(case_study_id, student_id)
            .ok_or(StoreError::NotFound("Enrollment"))?;

        // All checks passed; from here on nothing can fail.
        let attempt = match tables.attempts.get_mut(&attempt_id) {
            Some(attempt) => {
                attempt.evaluated_score = Some(score);
                attempt.evaluated_at = Some(Utc::now());
                attempt.clone()
            }
            None => return Err(StoreError::NotFound("Attempt")),
        };

        let scores: Vec<f64> = tables
            .attempts
            .values()
            .filter(|a| a.student_id == student_id)
            .filter(|a| tables.case_study_of(a.exercise_id) == Some(case_study_id))
            .filter_map(|a| a.evaluated_score)
            .collect();
        let final_score = final_score(scores);

        if let Some(enrollment) = tables.enrollments.get_mut(&enrollment_id) {
            enrollment.final_score = final_score;
        }

        Ok(Evaluation { attempt, final_score })
    }
}
