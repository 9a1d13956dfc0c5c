//! Evaluation helpers comparing predicted and expected cluster ids.

use super::dataset::ClusterId;
use crate::error::{Error, Result};

/// Per-point correctness of `predicted` against `expected`.
pub fn vertexwise_correctness(predicted: &[ClusterId], expected: &[ClusterId]) -> Result<Vec<bool>> {
    if predicted.len() != expected.len() {
        return Err(Error::LengthMismatch {
            data: predicted.len(),
            labels: expected.len(),
        });
    }
    Ok(predicted.iter().zip(expected).map(|(p, e)| p == e).collect())
}

/// Fraction of points whose predicted cluster matches the expected one.
pub fn accuracy(predicted: &[ClusterId], expected: &[ClusterId]) -> Result<f64> {
    let correct = vertexwise_correctness(predicted, expected)?;
    if correct.is_empty() {
        return Err(Error::EmptyInput);
    }
    Ok(correct.iter().filter(|&&c| c).count() as f64 / correct.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        let predicted: Vec<ClusterId> = ["a", "b", "b", "a"].into_iter().map(Into::into).collect();
        let expected: Vec<ClusterId> = ["a", "b", "a", "a"].into_iter().map(Into::into).collect();
        assert_eq!(
            vertexwise_correctness(&predicted, &expected).unwrap(),
            vec![true, true, false, true]
        );
        assert_eq!(accuracy(&predicted, &expected).unwrap(), 0.75);
    }

    #[test]
    fn test_int_and_str_ids_never_match() {
        assert_eq!(
            accuracy(&[ClusterId::from(1)], &[ClusterId::from("1")]).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_errors() {
        assert!(accuracy(&[], &[]).is_err());
        assert!(accuracy(&[ClusterId::from(0)], &[]).is_err());
    }
}
