use std::collections::HashSet;

use ripshelf_domain::MovieCandidate;

/// Automatic confidence never reaches 1.0; that value is reserved for a
/// human asserting the identification.
pub const CONFIDENCE_CEILING: f64 = 0.99;

const EXACT_TITLE: f64 = 0.70;
const SUBSTRING_TITLE: f64 = 0.50;
const OVERLAP_WEIGHT: f64 = 0.40;
const POPULARITY_WEIGHT: f64 = 0.15;
const FIRST_RESULT_BONUS: f64 = 0.15;

/// A catalog candidate with its computed confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: MovieCandidate,
    pub confidence: f64,
}

/// Score every candidate against the cleaned disc label.
///
/// `candidates` must be in catalog rank order; the top-ranked result gets a
/// small bonus since the catalog's own relevance sort is usually right.
pub fn score_candidates(cleaned_label: &str, candidates: &[MovieCandidate]) -> Vec<ScoredCandidate> {
    candidates
        .iter()
        .enumerate()
        .map(|(rank, candidate)| ScoredCandidate {
            candidate: candidate.clone(),
            confidence: score(cleaned_label, candidate, rank == 0),
        })
        .collect()
}

/// The highest-confidence candidate, if any.
pub fn best_match(cleaned_label: &str, candidates: &[MovieCandidate]) -> Option<ScoredCandidate> {
    score_candidates(cleaned_label, candidates)
        .into_iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

fn score(cleaned_label: &str, candidate: &MovieCandidate, is_first: bool) -> f64 {
    let title = candidate.title.to_lowercase();

    let title_component = if !cleaned_label.is_empty() && title == cleaned_label {
        EXACT_TITLE
    } else if !cleaned_label.is_empty()
        && (title.contains(cleaned_label) || cleaned_label.contains(&title))
    {
        SUBSTRING_TITLE
    } else {
        token_overlap(cleaned_label, &title) * OVERLAP_WEIGHT
    };

    let popularity_component = (candidate.popularity / 100.0).clamp(0.0, 1.0) * POPULARITY_WEIGHT;
    let bonus = if is_first { FIRST_RESULT_BONUS } else { 0.0 };

    (title_component + popularity_component + bonus).clamp(0.0, CONFIDENCE_CEILING)
}

/// Jaccard similarity over whitespace tokens.
fn token_overlap(a: &str, b: &str) -> f64 {
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, popularity: f64) -> MovieCandidate {
        MovieCandidate {
            catalog_id: 603,
            title: title.to_string(),
            year: Some(1999),
            overview: String::new(),
            poster_ref: None,
            popularity,
        }
    }

    #[test]
    fn exact_popular_first_result_clears_auto_approval() {
        let best = best_match("the matrix", &[candidate("The Matrix", 100.0)]).unwrap();
        assert!(best.confidence >= 0.85, "got {}", best.confidence);
    }

    #[test]
    fn confidence_never_reaches_one() {
        let best = best_match("the matrix", &[candidate("The Matrix", 10_000.0)]).unwrap();
        assert!(best.confidence <= CONFIDENCE_CEILING);
        assert!(best.confidence < 1.0);
    }

    #[test]
    fn substring_scores_below_exact() {
        let exact = best_match("dune", &[candidate("Dune", 50.0)]).unwrap();
        let partial = best_match("dune", &[candidate("Dune: Part Two", 50.0)]).unwrap();
        assert!(exact.confidence > partial.confidence);
    }

    #[test]
    fn token_overlap_scores_lowest() {
        let overlap = best_match(
            "the quick fox",
            &[candidate("The Slow Fox Returns", 0.0)],
        )
        .unwrap();
        // 2 shared of 5 distinct tokens, plus the first-result bonus.
        let expected = (2.0 / 5.0) * 0.40 + 0.15;
        assert!((overlap.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn first_result_bonus_only_applies_to_rank_zero() {
        let scored = score_candidates(
            "heat",
            &[candidate("Heat", 0.0), candidate("Heat", 0.0)],
        );
        assert!((scored[0].confidence - scored[1].confidence - 0.15).abs() < 1e-9);
    }

    #[test]
    fn popularity_is_capped() {
        let modest = best_match("zzz", &[candidate("aaa", 100.0)]).unwrap();
        let huge = best_match("zzz", &[candidate("aaa", 90_000.0)]).unwrap();
        assert!((modest.confidence - huge.confidence).abs() < 1e-9);
    }

    #[test]
    fn empty_label_gets_no_title_credit() {
        let best = best_match("", &[candidate("Anything", 100.0)]).unwrap();
        // Popularity cap plus first-result bonus only.
        assert!((best.confidence - 0.30).abs() < 1e-9);
    }

    #[test]
    fn best_match_picks_highest() {
        let candidates = vec![
            candidate("Solaris", 20.0),
            candidate("The Matrix", 80.0),
        ];
        // Exact match on rank 1 beats fuzzy on rank 0.
        let best = best_match("the matrix", &candidates).unwrap();
        assert_eq!(best.candidate.title, "The Matrix");
    }

    #[test]
    fn no_candidates_no_match() {
        assert!(best_match("anything", &[]).is_none());
    }
}
