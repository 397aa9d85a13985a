// src/grading/progress.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    attempt::Attempt,
    case_study::{Exercise, ModuleOutline},
};

/// Where a student should land: the next unattempted exercise, or the one they
/// touched last once everything has been attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CurrentPosition {
    #[serde(rename_all = "camelCase")]
    Next { module_id: Uuid, exercise_id: Uuid },
    #[serde(rename_all = "camelCase")]
    LastAttempted {
        module_id: Uuid,
        exercise_id: Uuid,
        attempted_at: DateTime<Utc>,
    },
}

impl CurrentPosition {
    pub fn exercise_id(&self) -> Uuid {
        match self {
            CurrentPosition::Next { exercise_id, .. } => *exercise_id,
            CurrentPosition::LastAttempted { exercise_id, .. } => *exercise_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_exercises: i64,
    pub attempted_exercises: i64,
    pub completion_percentage: i64,
    pub current_position: Option<CurrentPosition>,
}

/// Integer percentage, rounded half-up. An empty set is 0%.
pub fn completion_percentage(attempted: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (attempted * 100 + total / 2) / total
}

/// Summarises a student's progress through an ordered set of modules.
///
/// Modules and exercises are walked by `order_number` (ties broken by id),
/// never by the order they arrive in. Attempts on exercises outside the
/// outline are ignored.
pub fn aggregate_progress(outline: &[ModuleOutline], attempts: &[Attempt]) -> ProgressSummary {
    let mut modules: Vec<&ModuleOutline> = outline.iter().collect();
    modules.sort_by_key(|m| (m.module.order_number, m.module.id));

    let ordered: Vec<(Uuid, &Exercise)> = modules
        .iter()
        .flat_map(|m| {
            let mut exercises: Vec<&Exercise> = m.exercises.iter().collect();
            exercises.sort_by_key(|e| (e.order_number, e.id));
            exercises.into_iter().map(move |e| (m.module.id, e))
        })
        .collect();

    let module_of: HashMap<Uuid, Uuid> = ordered.iter().map(|(m, e)| (e.id, *m)).collect();

    let relevant: Vec<&Attempt> = attempts
        .iter()
        .filter(|a| module_of.contains_key(&a.exercise_id))
        .collect();

    let attempted: HashSet<Uuid> = relevant.iter().map(|a| a.exercise_id).collect();

    let total_exercises = ordered.len() as i64;
    let attempted_exercises = attempted.len() as i64;

    let current_position = ordered
        .iter()
        .find(|(_, e)| !attempted.contains(&e.id))
        .map(|(module_id, e)| CurrentPosition::Next {
            module_id: *module_id,
            exercise_id: e.id,
        })
        .or_else(|| {
            relevant
                .iter()
                // Equal timestamps resolve to the highest attempt id, which is
                // arbitrary but stable across calls.
                .max_by_key(|a| (a.created_at, a.id))
                .map(|a| CurrentPosition::LastAttempted {
                    module_id: module_of[&a.exercise_id],
                    exercise_id: a.exercise_id,
                    attempted_at: a.created_at,
                })
        });

    ProgressSummary {
        total_exercises,
        attempted_exercises,
        completion_percentage: completion_percentage(attempted_exercises, total_exercises),
        current_position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case_study::Module;
    use chrono::Duration;

    fn outline(order: i32, exercise_count: i32) -> ModuleOutline {
        let module_id = Uuid::new_v4();
        let exercises = (1..=exercise_count)
            .map(|n| Exercise {
                id: Uuid::new_v4(),
                module_id,
                title: format!("Exercise {}", n),
                prompt: String::new(),
                order_number: n,
                created_at: Utc::now(),
            })
            .collect();
        ModuleOutline {
            module: Module {
                id: module_id,
                case_study_id: Uuid::nil(),
                title: format!("Module {}", order),
                order_number: order,
                created_at: Utc::now(),
            },
            exercises,
        }
    }

    fn attempt(exercise_id: Uuid, minutes_ago: i64) -> Attempt {
        Attempt {
            id: Uuid::new_v4(),
            exercise_id,
            student_id: Uuid::nil(),
            attempt_number: 1,
            response: "answer".to_string(),
            evaluated_score: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            evaluated_at: None,
        }
    }

    #[test]
    fn test_completion_percentage_rounding() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(2, 5), 40);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(4, 4), 100);
    }

    #[test]
    fn test_partial_progress_points_at_next() {
        let m1 = outline(1, 3);
        let m2 = outline(2, 2);
        let attempts = vec![
            attempt(m1.exercises[0].id, 10),
            attempt(m1.exercises[1].id, 5),
            attempt(m1.exercises[1].id, 1),
        ];

        let summary = aggregate_progress(&[m1.clone(), m2], &attempts);
        assert_eq!(summary.total_exercises, 5);
        assert_eq!(summary.attempted_exercises, 2);
        assert_eq!(summary.completion_percentage, 40);
        assert_eq!(
            summary.current_position,
            Some(CurrentPosition::Next {
                module_id: m1.module.id,
                exercise_id: m1.exercises[2].id,
            })
        );
    }

    #[test]
    fn test_all_attempted_points_at_most_recent() {
        let m1 = outline(1, 3);
        let m2 = outline(2, 2);
        let last = attempt(m2.exercises[1].id, 0);
        let mut attempts: Vec<Attempt> = m1
            .exercises
            .iter()
            .chain(m2.exercises.iter().take(1))
            .enumerate()
            .map(|(i, e)| attempt(e.id, 60 - i as i64))
            .collect();
        attempts.push(last.clone());

        let summary = aggregate_progress(&[m1, m2.clone()], &attempts);
        assert_eq!(summary.completion_percentage, 100);
        assert_eq!(
            summary.current_position,
            Some(CurrentPosition::LastAttempted {
                module_id: m2.module.id,
                exercise_id: m2.exercises[1].id,
                attempted_at: last.created_at,
            })
        );
    }

    #[test]
    fn test_timestamp_ties_resolve_by_attempt_id() {
        let m1 = outline(1, 2);
        let mut a = attempt(m1.exercises[0].id, 0);
        let mut b = attempt(m1.exercises[1].id, 0);
        b.created_at = a.created_at;
        // A later attempt number on the other exercise must not decide the tie.
        a.attempt_number = 7;
        let winner = if a.id > b.id { &a } else { &b };

        let forward = aggregate_progress(&[m1.clone()], &[a.clone(), b.clone()]);
        let reversed = aggregate_progress(&[m1], &[b.clone(), a.clone()]);
        assert_eq!(
            forward.current_position.as_ref().map(|p| p.exercise_id()),
            Some(winner.exercise_id)
        );
        assert_eq!(forward.current_position, reversed.current_position);
    }

    #[test]
    fn test_order_numbers_beat_storage_order() {
        let first = outline(1, 1);
        let second = outline(2, 1);

        // Storage hands the modules back reversed.
        let summary = aggregate_progress(&[second, first.clone()], &[]);
        assert_eq!(
            summary.current_position.map(|p| p.exercise_id()),
            Some(first.exercises[0].id)
        );
    }

    #[test]
    fn test_exercise_order_within_module() {
        let mut m1 = outline(1, 3);
        m1.exercises.reverse();
        let lowest = m1.exercises.iter().min_by_key(|e| e.order_number).unwrap().id;

        let summary = aggregate_progress(&[m1], &[]);
        assert_eq!(summary.current_position.map(|p| p.exercise_id()), Some(lowest));
    }

    #[test]
    fn test_empty_outline() {
        let summary = aggregate_progress(&[], &[attempt(Uuid::new_v4(), 0)]);
        assert_eq!(summary.total_exercises, 0);
        assert_eq!(summary.attempted_exercises, 0);
        assert_eq!(summary.completion_percentage, 0);
        assert_eq!(summary.current_position, None);
    }

    #[test]
    fn test_foreign_attempts_are_ignored() {
        let m1 = outline(1, 2);
        let attempts = vec![attempt(Uuid::new_v4(), 0), attempt(m1.exercises[0].id, 3)];

        let summary = aggregate_progress(&[m1], &attempts);
        assert_eq!(summary.attempted_exercises, 1);
        assert_eq!(summary.completion_percentage, 50);
    }

    #[test]
    fn test_position_serializes_as_tagged_union() {
        let position = CurrentPosition::Next {
            module_id: Uuid::nil(),
            exercise_id: Uuid::nil(),
        };
        let value = serde_json::to_value(&position).unwrap();
        assert_eq!(value["kind"], "next");
        assert!(value.get("exerciseId").is_some());
    }
}
