mod clean;
mod score;

pub use clean::clean_disc_label;
pub use score::{best_match, score_candidates, ScoredCandidate, CONFIDENCE_CEILING};
