//! Curator Pipeline
//!
//! The linear curation run over already-collected article records:
//! - **Normalizer**: canonical URLs and plain-text fields
//! - **Deduplicator**: URL-equivalent duplicates and cached articles out
//! - **RelevanceScorer**: recency, consensus, popularity, interest, authority
//! - **Selectors**: bounded candidate set, then the final per-domain-capped pick
//! - **Pipeline**: runs the stages and records the run summary

pub mod config;
pub mod dedup;
pub mod normalizer;
pub mod pipeline;
pub mod scorer;
pub mod select;

pub use config::*;
pub use dedup::*;
pub use normalizer::*;
pub use pipeline::*;
pub use scorer::*;
pub use select::*;
