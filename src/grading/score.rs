// src/grading/score.rs

/// Rolling final score: the mean of all evaluated scores, rounded to 2
/// decimals. No evaluated attempts yields `0.0`.
pub fn final_score<I>(scores: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = scores
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, count), s| (sum + s, count + 1));

    if count == 0 {
        return 0.0;
    }

    round_to_cents(sum / count as f64)
}

/// Half-away-from-zero on the binary value, not the decimal literal: 1.005
/// is stored as 1.00499.. and rounds down to 1.0.
fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_score_mean() {
        assert_eq!(final_score([4.0, 5.0, 3.0]), 4.0);
    }

    #[test]
    fn test_final_score_rounds_to_two_decimals() {
        assert_eq!(final_score([1.0, 2.0, 2.0]), 1.67);
        assert_eq!(final_score([4.5]), 4.5);
    }

    #[test]
    fn test_final_score_rounds_binary_value() {
        assert_eq!(final_score([1.005]), 1.0);
        assert_eq!(final_score([0.125]), 0.13);
    }

    #[test]
    fn test_final_score_empty_is_zero() {
        assert_eq!(final_score(Vec::<f64>::new()), 0.0);
    }
}
