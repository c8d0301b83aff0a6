//! Engine services: similarity ranking and recommendation orchestration.

pub mod rank;
pub mod recommend;

pub use rank::{rank, RankedCandidate, SongVector, SCORE_EPSILON};
pub use recommend::{RecommendOptions, RecommendationService, SongView, DEFAULT_TOP_K};
