// src/grading/matcher.rs

use std::collections::HashSet;

use thiserror::Error;

/// The student selected nothing for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no answer submitted")]
pub struct Unanswered;

/// Compares submitted answer keys against the expected set.
///
/// Submitted keys that are no longer valid for the question are dropped first,
/// so a key removed from the question after the student picked it does not
/// turn a correct answer into a wrong one. The remaining keys must equal the
/// expected set exactly. Order and duplicates are ignored on both sides.
pub fn answer_set_matches(expected: &[String], submitted: &[String]) -> Result<bool, Unanswered> {
    if submitted.is_empty() {
        return Err(Unanswered);
    }

    let expected: HashSet<&str> = expected.iter().map(String::as_str).collect();
    let current: HashSet<&str> = submitted
        .iter()
        .map(String::as_str)
        .filter(|key| expected.contains(key))
        .collect();

    Ok(current == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(answer_set_matches(&keys(&["a", "b"]), &keys(&["a", "b"])), Ok(true));
    }

    #[test]
    fn test_order_is_ignored() {
        assert_eq!(answer_set_matches(&keys(&["a", "b"]), &keys(&["b", "a"])), Ok(true));
    }

    #[test]
    fn test_duplicates_are_ignored() {
        assert_eq!(answer_set_matches(&keys(&["a", "b"]), &keys(&["a", "a", "b"])), Ok(true));
    }

    #[test]
    fn test_stale_key_is_discarded() {
        // "c" was valid once but has since been removed from the question.
        assert_eq!(answer_set_matches(&keys(&["a", "b"]), &keys(&["a", "b", "c"])), Ok(true));
    }

    #[test]
    fn test_subset_is_incorrect() {
        assert_eq!(answer_set_matches(&keys(&["a", "b"]), &keys(&["a"])), Ok(false));
    }

    #[test]
    fn test_only_stale_keys_is_incorrect() {
        assert_eq!(answer_set_matches(&keys(&["x"]), &keys(&["y"])), Ok(false));
    }

    #[test]
    fn test_empty_submission_is_unanswered() {
        assert_eq!(answer_set_matches(&keys(&["x"]), &[]), Err(Unanswered));
    }
}
