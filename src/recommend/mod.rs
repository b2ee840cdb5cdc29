//! Recommendation engine: vector codec, similarity, ranking policy, and the
//! per-user orchestration that ties them to the catalog.

pub mod codec;
pub mod orchestrator;
pub mod rank;
pub mod similarity;

pub use orchestrator::{recommend_for_user, Recommendations, RecommendSettings, RecommendedEvent};
pub use rank::{rank, Candidate, RankPolicy, Ranking, ScoredCandidate};
pub use similarity::cosine_similarity;
