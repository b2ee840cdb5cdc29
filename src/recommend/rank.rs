//! Candidate ranking: cosine similarity blended with category keyword matching.
//!
//! [`rank`] is a pure function of the query vector, the candidate list, the
//! user's interest keywords and a [`RankPolicy`]. It never mutates its inputs.
//! Category-matched candidates bypass the similarity threshold so lexical
//! relevance still surfaces when the embedding signal is weak.

use thiserror::Error;

use super::similarity::{check_finite, cosine_similarity, SimilarityError};

/// Characters (besides whitespace) that separate words in a category label.
const CATEGORY_DELIMITERS: [char; 2] = ['&', '-'];

/// Scoring knobs for one ranking pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankPolicy {
    /// Added to the base similarity when the category matches an interest.
    pub category_boost: f32,
    /// Minimum final score for candidates without a category match.
    pub similarity_threshold: f32,
    /// Maximum number of results.
    pub limit: usize,
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            category_boost: 0.2,
            similarity_threshold: 0.2,
            limit: 10,
        }
    }
}

impl RankPolicy {
    /// Boost and threshold must be finite and the limit at least 1; anything
    /// else would let NaN into the sort or silently return nothing.
    pub fn validate(&self) -> Result<(), RankError> {
        if !self.category_boost.is_finite() {
            return Err(RankError::InvalidPolicy("category_boost must be finite"));
        }
        if !self.similarity_threshold.is_finite() {
            return Err(RankError::InvalidPolicy("similarity_threshold must be finite"));
        }
        if self.limit == 0 {
            return Err(RankError::InvalidPolicy("limit must be at least 1"));
        }
        Ok(())
    }
}

/// Something that can be ranked: an embedding plus an optional category label.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<K> {
    pub key: K,
    pub embedding: Option<Vec<f32>>,
    pub category: Option<String>,
}

/// A kept candidate with its score breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a, K> {
    pub candidate: &'a Candidate<K>,
    /// Cosine similarity, with "undefined" mapped to 0.
    pub similarity: f32,
    /// Boost applied for the category match (0 when none).
    pub boost: f32,
    /// `similarity + boost`; the sort key.
    pub score: f32,
    pub category_match: bool,
}

/// A candidate that could not be compared against the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected<'a, K> {
    pub candidate: &'a Candidate<K>,
    pub error: SimilarityError,
}

/// Ranked output plus the candidates skipped for data-integrity faults.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking<'a, K> {
    pub results: Vec<ScoredCandidate<'a, K>>,
    pub rejected: Vec<Rejected<'a, K>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    #[error("query vector is empty")]
    EmptyQuery,

    #[error("invalid query vector: {0}")]
    InvalidQuery(#[from] SimilarityError),

    #[error("invalid rank policy: {0}")]
    InvalidPolicy(&'static str),
}

/// Rank `candidates` against `query`.
///
/// Candidates without an embedding are excluded. Candidates whose embedding
/// cannot be compared (wrong dimensionality, non-finite values) are excluded
/// and reported in [`Ranking::rejected`] without affecting the rest. Kept
/// candidates are ordered by score descending; equal scores keep input order.
pub fn rank<'a, K>(
    query: &[f32],
    candidates: &'a [Candidate<K>],
    interest_keywords: &[String],
    policy: &RankPolicy,
) -> Result<Ranking<'a, K>, RankError> {
    policy.validate()?;
    if query.is_empty() {
        return Err(RankError::EmptyQuery);
    }
    check_finite(query)?;

    let keywords: Vec<String> = interest_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let mut results = Vec::new();
    let mut rejected = Vec::new();

    for candidate in candidates {
        let Some(embedding) = candidate.embedding.as_deref() else {
            continue;
        };

        let similarity = match cosine_similarity(query, embedding) {
            Ok(sim) => sim.unwrap_or(0.0),
            Err(error) => {
                rejected.push(Rejected { candidate, error });
                continue;
            }
        };

        let category_match = candidate
            .category
            .as_deref()
            .is_some_and(|label| category_matches(label, &keywords));
        let boost = if category_match {
            policy.category_boost
        } else {
            0.0
        };
        let score = similarity + boost;

        if category_match || score >= policy.similarity_threshold {
            results.push(ScoredCandidate {
                candidate,
                similarity,
                boost,
                score,
                category_match,
            });
        }
    }

    // `sort_by` is stable; scores are finite so `total_cmp` agrees with `>`.
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(policy.limit);

    Ok(Ranking { results, rejected })
}

/// Split a category label into lowercase words on whitespace, `&` and `-`.
pub fn category_words(label: &str) -> Vec<String> {
    label
        .split(|c: char| c.is_whitespace() || CATEGORY_DELIMITERS.contains(&c))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whole-word, case-insensitive match between a category label and lowercase keywords.
fn category_matches(label: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    category_words(label)
        .iter()
        .any(|word| keywords.iter().any(|k| k == word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// A 2-d unit vector whose cosine with `[1, 0]` is exactly `sim`.
    fn at_similarity(sim: f32) -> Vec<f32> {
        vec![sim, (1.0 - sim * sim).max(0.0).sqrt()]
    }

    fn query() -> Vec<f32> {
        vec![1.0, 0.0]
    }

    fn candidate(key: &'static str, sim: f32, category: Option<&str>) -> Candidate<&'static str> {
        Candidate {
            key,
            embedding: Some(at_similarity(sim)),
            category: category.map(String::from),
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn keys<'a>(ranking: &Ranking<'a, &'static str>) -> Vec<&'static str> {
        ranking.results.iter().map(|r| r.candidate.key).collect()
    }

    #[rstest]
    #[case("Outdoors & Adventure", &["outdoors", "adventure"])]
    #[case("Sci-Fi", &["sci", "fi"])]
    #[case("  Food   &  Drink ", &["food", "drink"])]
    #[case("Music", &["music"])]
    #[case("arts&crafts", &["arts", "crafts"])]
    #[case("Tech\tTalks", &["tech", "talks"])]
    #[case("", &[])]
    fn splits_category_labels(#[case] label: &str, #[case] expected: &[&str]) {
        assert_eq!(category_words(label), expected);
    }

    #[rstest]
    #[case("Outdoors & Adventure", &["ADVENTURE"], true)]
    #[case("Outdoors & Adventure", &["hiking", "nature"], false)]
    #[case("Finance", &["fin"], false)]
    #[case("Sci-Fi", &["fi"], true)]
    #[case("Music", &[], false)]
    fn matches_whole_words_only(
        #[case] label: &str,
        #[case] words: &[&str],
        #[case] expected: bool,
    ) {
        let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        assert_eq!(category_matches(label, &lowered), expected);
    }

    #[test]
    fn category_match_bypasses_threshold() {
        let candidates = vec![candidate("meetup", 0.0, Some("Music & Arts"))];
        let policy = RankPolicy {
            category_boost: 0.2,
            similarity_threshold: 0.5,
            limit: 10,
        };
        let ranking = rank(&query(), &candidates, &keywords(&["music"]), &policy).unwrap();

        assert_eq!(ranking.results.len(), 1);
        let hit = &ranking.results[0];
        assert!(hit.category_match);
        assert!((hit.score - 0.2).abs() < 1e-6);
        assert!((hit.boost - 0.2).abs() < 1e-6);
    }

    #[test]
    fn below_threshold_without_match_is_excluded() {
        let candidates = vec![candidate("lecture", 0.1, Some("Finance"))];
        let policy = RankPolicy {
            similarity_threshold: 0.2,
            ..RankPolicy::default()
        };
        let ranking = rank(&query(), &candidates, &keywords(&["music"]), &policy).unwrap();
        assert!(ranking.results.is_empty());
        assert!(ranking.rejected.is_empty());
    }

    #[test]
    fn score_at_threshold_is_kept() {
        let candidates = vec![Candidate {
            key: "edge",
            embedding: Some(vec![1.0, 0.0]),
            category: None,
        }];
        let policy = RankPolicy {
            similarity_threshold: 1.0,
            ..RankPolicy::default()
        };
        let ranking = rank(&query(), &candidates, &[], &policy).unwrap();
        assert_eq!(keys(&ranking), vec!["edge"]);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let candidates = vec![
            candidate("a", 0.5, None),
            candidate("b", 0.5, None),
            candidate("c", 0.9, None),
        ];
        let ranking = rank(&query(), &candidates, &[], &RankPolicy::default()).unwrap();
        assert_eq!(keys(&ranking), vec!["c", "a", "b"]);
    }

    #[test]
    fn absent_embeddings_never_appear() {
        let candidates = vec![
            Candidate {
                key: "no-vector",
                embedding: None,
                category: Some("Music".into()),
            },
            candidate("kept", 0.8, None),
        ];
        let ranking =
            rank(&query(), &candidates, &keywords(&["music"]), &RankPolicy::default()).unwrap();
        assert_eq!(keys(&ranking), vec!["kept"]);
        assert!(ranking.rejected.is_empty());
    }

    #[test]
    fn truncates_to_limit() {
        let candidates: Vec<Candidate<usize>> = (0..30)
            .map(|i| Candidate {
                key: i,
                embedding: Some(at_similarity(0.3 + i as f32 * 0.02)),
                category: None,
            })
            .collect();
        let policy = RankPolicy {
            limit: 10,
            ..RankPolicy::default()
        };
        let ranking = rank(&query(), &candidates, &[], &policy).unwrap();
        let got: Vec<usize> = ranking.results.iter().map(|r| r.candidate.key).collect();
        assert_eq!(got, (20..30).rev().collect::<Vec<_>>());
    }

    #[test]
    fn boost_reorders_results() {
        let candidates = vec![
            candidate("similar", 0.6, Some("Finance")),
            candidate("boosted", 0.5, Some("Jazz Nights")),
        ];
        let ranking =
            rank(&query(), &candidates, &keywords(&["jazz"]), &RankPolicy::default()).unwrap();
        assert_eq!(keys(&ranking), vec!["boosted", "similar"]);
        assert!((ranking.results[0].score - 0.7).abs() < 1e-6);
        assert!((ranking.results[0].similarity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_candidate_scores_zero() {
        let candidates = vec![
            Candidate {
                key: "zero",
                embedding: Some(vec![0.0, 0.0]),
                category: Some("Hiking".into()),
            },
            Candidate {
                key: "zero-unmatched",
                embedding: Some(vec![0.0, 0.0]),
                category: None,
            },
        ];
        let ranking =
            rank(&query(), &candidates, &keywords(&["hiking"]), &RankPolicy::default()).unwrap();
        assert_eq!(keys(&ranking), vec!["zero"]);
        assert_eq!(ranking.results[0].similarity, 0.0);
    }

    #[test]
    fn faulty_candidates_are_rejected_not_fatal() {
        let candidates = vec![
            Candidate {
                key: "short",
                embedding: Some(vec![1.0]),
                category: None,
            },
            Candidate {
                key: "nan",
                embedding: Some(vec![f32::NAN, 1.0]),
                category: None,
            },
            candidate("good", 0.9, None),
        ];
        let ranking = rank(&query(), &candidates, &[], &RankPolicy::default()).unwrap();
        assert_eq!(keys(&ranking), vec!["good"]);
        let rejected: Vec<&str> = ranking.rejected.iter().map(|r| r.candidate.key).collect();
        assert_eq!(rejected, vec!["short", "nan"]);
        assert_eq!(
            ranking.rejected[0].error,
            SimilarityError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn empty_candidates_give_empty_ranking() {
        let candidates: Vec<Candidate<u32>> = Vec::new();
        let ranking = rank(&query(), &candidates, &[], &RankPolicy::default()).unwrap();
        assert!(ranking.results.is_empty());
    }

    #[test]
    fn invalid_query_is_an_error() {
        let candidates = vec![candidate("a", 0.9, None)];
        assert_eq!(
            rank(&[], &candidates, &[], &RankPolicy::default()).unwrap_err(),
            RankError::EmptyQuery
        );
        assert!(matches!(
            rank(&[f32::NAN, 1.0], &candidates, &[], &RankPolicy::default()),
            Err(RankError::InvalidQuery(_))
        ));
    }

    #[rstest]
    #[case(f32::NAN, 0.2, 10)]
    #[case(f32::INFINITY, 0.2, 10)]
    #[case(0.2, f32::NAN, 10)]
    #[case(0.2, f32::NEG_INFINITY, 10)]
    #[case(0.2, 0.2, 0)]
    fn non_finite_or_empty_policy_is_rejected(
        #[case] category_boost: f32,
        #[case] similarity_threshold: f32,
        #[case] limit: usize,
    ) {
        let candidates = vec![
            candidate("opera", 0.95, None),
            candidate("jazz-night", 0.1, Some("Jazz")),
        ];
        let policy = RankPolicy {
            category_boost,
            similarity_threshold,
            limit,
        };
        assert!(matches!(
            rank(&query(), &candidates, &keywords(&["jazz"]), &policy),
            Err(RankError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let candidates = vec![candidate("b", 0.3, None), candidate("a", 0.9, None)];
        let before = candidates.clone();
        let _ = rank(&query(), &candidates, &[], &RankPolicy::default()).unwrap();
        assert_eq!(candidates, before);
    }
}
