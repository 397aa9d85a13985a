// src/grading/submission.rs

use crate::{
    grading::{GradingError, matcher::answer_set_matches},
    models::{
        submission::{AnswerMap, CorrectAnswer, GradingResult},
        topic::Question,
    },
};

/// Grades every question of a topic against the submitted answers.
///
/// Fails fast on the first question (in `order_number` order) that has no
/// entry or an empty entry; no partial result is produced. Answers for
/// questions outside `questions` are ignored.
pub fn grade_submission(
    questions: &[Question],
    answers: &AnswerMap,
) -> Result<GradingResult, GradingError> {
    let mut ordered: Vec<&Question> = questions.iter().collect();
    ordered.sort_by_key(|q| (q.order_number, q.id));

    let mut verdicts = Vec::with_capacity(ordered.len());
    for question in &ordered {
        let submitted = answers.get(&question.id).ok_or(GradingError::MissingAnswer {
            question_id: question.id,
        })?;

        let correct = answer_set_matches(&question.answer_keys.0, submitted).map_err(|_| {
            GradingError::EmptyAnswer {
                question_id: question.id,
            }
        })?;

        verdicts.push(correct);
    }

    let (correct, incorrect): (Vec<bool>, Vec<bool>) = verdicts.into_iter().partition(|ok| *ok);

    let correct_answers = ordered
        .iter()
        .map(|q| CorrectAnswer {
            question_id: q.id,
            expected_keys: q.answer_keys.0.clone(),
        })
        .collect();

    Ok(GradingResult {
        questions_attempted: ordered.len() as i64,
        questions_correct: correct.len() as i64,
        questions_incorrect: incorrect.len() as i64,
        // No question is counted as skipped yet.
        questions_skipped: 0,
        correct_answers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn question(order: i32, keys: &[&str]) -> Question {
        Question {
            id: Uuid::new_v4(),
            topic_id: Uuid::nil(),
            content: format!("Question {}", order),
            answer_keys: Json(keys.iter().map(|k| k.to_string()).collect()),
            order_number: order,
            created_at: chrono::Utc::now(),
        }
    }

    fn answer(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_grade_mixed_submission() {
        let q1 = question(1, &["a", "b"]);
        let q2 = question(2, &["x"]);
        let q3 = question(3, &["m", "n"]);

        let mut answers = AnswerMap::new();
        answers.insert(q1.id, answer(&["a", "b", "c"]));
        answers.insert(q2.id, answer(&["y"]));
        answers.insert(q3.id, answer(&["n", "m"]));

        let result = grade_submission(&[q1, q2, q3], &answers).unwrap();
        assert_eq!(result.questions_attempted, 3);
        assert_eq!(result.questions_correct, 2);
        assert_eq!(result.questions_incorrect, 1);
        assert_eq!(result.questions_skipped, 0);
        assert_eq!(result.correct_answers.len(), 3);
    }

    #[test]
    fn test_missing_answer_names_question() {
        let q1 = question(1, &["a"]);
        let q2 = question(2, &["x"]);

        let mut answers = AnswerMap::new();
        answers.insert(q1.id, answer(&["a"]));

        let err = grade_submission(&[q1, q2.clone()], &answers).unwrap_err();
        assert_eq!(err, GradingError::MissingAnswer { question_id: q2.id });
    }

    #[test]
    fn test_empty_answer_is_rejected() {
        let q1 = question(1, &["a"]);

        let mut answers = AnswerMap::new();
        answers.insert(q1.id, vec![]);

        let err = grade_submission(&[q1.clone()], &answers).unwrap_err();
        assert_eq!(err, GradingError::EmptyAnswer { question_id: q1.id });
    }

    #[test]
    fn test_first_failure_in_order_wins() {
        let late = question(5, &["a"]);
        let early = question(1, &["a"]);

        // Neither has an answer; storage order lists the later question first.
        let err = grade_submission(&[late, early.clone()], &AnswerMap::new()).unwrap_err();
        assert_eq!(err, GradingError::MissingAnswer { question_id: early.id });
    }

    #[test]
    fn test_snapshots_follow_question_order() {
        let q2 = question(2, &["b"]);
        let q1 = question(1, &["a"]);

        let mut answers = AnswerMap::new();
        answers.insert(q1.id, answer(&["a"]));
        answers.insert(q2.id, answer(&["a"]));

        let result = grade_submission(&[q2.clone(), q1.clone()], &answers).unwrap();
        let ids: Vec<Uuid> = result.correct_answers.iter().map(|c| c.question_id).collect();
        assert_eq!(ids, vec![q1.id, q2.id]);
        assert_eq!(result.correct_answers[1].expected_keys, vec!["b".to_string()]);
    }

    #[test]
    fn test_regrading_is_idempotent() {
        let q1 = question(1, &["a", "b"]);
        let q2 = question(2, &["c"]);

        let mut answers = AnswerMap::new();
        answers.insert(q1.id, answer(&["b", "a"]));
        answers.insert(q2.id, answer(&["d"]));

        let questions = vec![q1, q2];
        let first = grade_submission(&questions, &answers).unwrap();
        let second = grade_submission(&questions, &answers).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_empty_topic() {
        let result = grade_submission(&[], &AnswerMap::new()).unwrap();
        assert_eq!(result.questions_attempted, 0);
        assert_eq!(result.questions_correct, 0);
        assert!(result.correct_answers.is_empty());
    }

    #[test]
    fn test_extra_answers_are_ignored() {
        let q1 = question(1, &["a"]);

        let mut answers = AnswerMap::new();
        answers.insert(q1.id, answer(&["a"]));
        answers.insert(Uuid::new_v4(), answer(&["z"]));

        let result = grade_submission(&[q1], &answers).unwrap();
        assert_eq!(result.questions_attempted, 1);
        assert_eq!(result.questions_correct, 1);
    }
}
