//! Text analysis for Scoreline: duplicate detection primitives, entity
//! extraction, and the importance scoring model.
//!
//! Everything here is pure and deterministic. Dictionaries (teams, source
//! authority) are injected at construction so callers and tests can
//! substitute their own tables.

pub mod authority;
pub mod entities;
pub mod scorer;
pub mod text;
pub mod topics;

pub use authority::SourceAuthority;
pub use entities::EntityExtractor;
pub use scorer::{sort_by_importance, ImportanceScore, ImportanceScorer, RankedItem};
pub use text::{content_fingerprint, jaccard_similarity, tokenize, SIMILARITY_THRESHOLD};
pub use topics::extract_topics;
