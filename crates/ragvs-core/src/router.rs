//! Score-threshold routing between grounded (RAG) and plain LLM answers.

use ragvs_memory::{Route, ScoredMatch};

use crate::error::RagError;

pub const DEFAULT_THRESHOLD: f32 = 0.60;

/// `Rag` when `top_score >= threshold`, `Llm` otherwise.
#[must_use]
pub fn decide(top_score: f32, threshold: f32) -> Route {
    if top_score >= threshold {
        Route::Rag
    } else {
        Route::Llm
    }
}

/// # Errors
///
/// Returns [`RagError::InvalidInput`] unless `threshold` lies in `[0, 1]`.
pub fn validate_threshold(threshold: f32) -> Result<(), RagError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(RagError::InvalidInput(format!(
            "threshold must be between 0 and 1, got {threshold}"
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub route: Route,
    pub top_score: f32,
    /// Matches forwarded to the prompt; always empty for [`Route::Llm`].
    pub context: Vec<ScoredMatch>,
}

impl RouteDecision {
    /// Route on the first (best) match.
    ///
    /// An empty match list scores `0.0` and always routes to [`Route::Llm`], even
    /// with a zero threshold.
    #[must_use]
    pub fn from_matches(matches: Vec<ScoredMatch>, threshold: f32) -> Self {
        let top_score = matches.first().map_or(0.0, |m| m.score);
        let route = if matches.is_empty() {
            Route::Llm
        } else {
            decide(top_score, threshold)
        };
        let context = match route {
            Route::Rag => matches,
            Route::Llm => Vec::new(),
        };
        tracing::debug!(%route, top_score, threshold, "routing decision");
        Self {
            route,
            top_score,
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn scored(scores: &[f32]) -> Vec<ScoredMatch> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| ScoredMatch {
                text: format!("doc {i}"),
                score: *s,
            })
            .collect()
    }

    #[test]
    fn equality_routes_to_rag() {
        assert_eq!(decide(0.60, 0.60), Route::Rag);
        assert_eq!(decide(0.59, 0.60), Route::Llm);
        assert_eq!(decide(0.0, 0.0), Route::Rag);
    }

    #[test]
    fn high_score_keeps_all_matches() {
        let decision = RouteDecision::from_matches(scored(&[0.75, 0.5, 0.2]), DEFAULT_THRESHOLD);
        assert_eq!(decision.route, Route::Rag);
        assert_eq!(decision.context.len(), 3);
        assert!((decision.top_score - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn low_score_discards_matches() {
        let decision = RouteDecision::from_matches(scored(&[0.3, 0.2]), DEFAULT_THRESHOLD);
        assert_eq!(decision.route, Route::Llm);
        assert!(decision.context.is_empty());
    }

    #[test]
    fn empty_matches_route_to_llm_for_any_threshold() {
        for threshold in [0.0, 0.01, 0.6, 1.0] {
            let decision = RouteDecision::from_matches(Vec::new(), threshold);
            assert_eq!(decision.route, Route::Llm);
        }
    }

    #[test]
    fn threshold_bounds() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-0.01).is_err());
        assert!(validate_threshold(1.01).is_err());
        assert!(validate_threshold(f32::NAN).is_err());
    }

    proptest! {
        #[test]
        fn decide_matches_comparison(score in 0.0f32..=1.0, threshold in 0.0f32..=1.0) {
            let expected = if score >= threshold { Route::Rag } else { Route::Llm };
            prop_assert_eq!(decide(score, threshold), expected);
        }
    }
}
