use std::collections::BTreeSet;

use serde::Serialize;

const MISMATCH_BELOW: u8 = 70;
const PASS_FROM: u8 = 90;

/// Lowercase, trim, and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Percentage similarity of two names: 100 for identical normalized strings,
/// otherwise the Jaccard index over whitespace-separated tokens.
pub fn name_match_score(left: &str, right: &str) -> u8 {
    let left = normalize_name(left);
    let right = normalize_name(right);
    if left == right {
        return 100;
    }

    let left_tokens: BTreeSet<&str> = left.split(' ').filter(|t| !t.is_empty()).collect();
    let right_tokens: BTreeSet<&str> = right.split(' ').filter(|t| !t.is_empty()).collect();
    let union = left_tokens.union(&right_tokens).count();
    if union == 0 {
        return 0;
    }
    let shared = left_tokens.intersection(&right_tokens).count();

    ((shared as f64 / union as f64) * 100.0).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameVerdict {
    Pass,
    Warning,
    Mismatch,
}

impl NameVerdict {
    pub fn from_score(score: u8) -> Self {
        if score < MISMATCH_BELOW {
            NameVerdict::Mismatch
        } else if score < PASS_FROM {
            NameVerdict::Warning
        } else {
            NameVerdict::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names_score_full_marks() {
        for name in ["Rajesh Kumar", "  RAJESH   kumar ", "Priya"] {
            assert_eq!(name_match_score(name, name), 100);
        }
        assert_eq!(name_match_score("Rajesh  Kumar", "rajesh kumar"), 100);
    }

    #[test]
    fn token_order_does_not_matter() {
        assert_eq!(name_match_score("John Doe", "Doe John"), 100);
    }

    #[test]
    fn disjoint_names_score_zero() {
        assert_eq!(name_match_score("A B", "C D"), 0);
    }

    #[test]
    fn partial_overlap_is_rounded_jaccard() {
        // {rajesh, kumar} vs {rajesh, kumar, sharma}: 2 / 3
        assert_eq!(name_match_score("Rajesh Kumar", "Rajesh Kumar Sharma"), 67);
        assert_eq!(NameVerdict::from_score(67), NameVerdict::Mismatch);
    }

    #[test]
    fn verdict_boundaries() {
        assert_eq!(NameVerdict::from_score(69), NameVerdict::Mismatch);
        assert_eq!(NameVerdict::from_score(70), NameVerdict::Warning);
        assert_eq!(NameVerdict::from_score(89), NameVerdict::Warning);
        assert_eq!(NameVerdict::from_score(90), NameVerdict::Pass);
    }
}
