//! Curator Core - domain model for tech article curation
//!
//! This crate provides the foundational primitives:
//! - Raw and normalized article records
//! - Judgment labels and fallback judgments
//! - Popularity signals, aggregated and relevance scores
//! - URL normalization
//! - Interest profile and source authority
//! - Judgment cache and run history contracts with file-backed stores

pub mod article;
pub mod authority;
pub mod interest;
pub mod judgment;
pub mod normalize;
pub mod score;
pub mod store;
pub mod summary;

pub use article::*;
pub use authority::*;
pub use interest::*;
pub use judgment::*;
pub use normalize::*;
pub use score::*;
pub use store::*;
pub use summary::*;

/// Popularity used when no signal source produced a value
pub const DEFAULT_POPULARITY: f64 = 20.0;

/// Interest score when no topic matches
pub const NEUTRAL_INTEREST: f64 = 50.0;

/// Maximum description length kept after normalization
pub const MAX_DESCRIPTION_CHARS: usize = 800;

/// Maximum judgment reason length
pub const MAX_REASON_CHARS: usize = 200;
