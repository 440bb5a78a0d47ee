//! Curator popularity signals
//!
//! One fetcher per external popularity source, all behind `SignalFetcher`:
//! - `PresenceFetcher`: listed in a curated feed or not
//! - `CountFetcher`: bookmark counts, batched
//! - `PagedRankFetcher`: position in a paginated weekly ranking
//! - `FeedRankFetcher`: position in a popular-items feed
//!
//! `SignalAggregator` runs them together and produces one weighted score
//! per URL.

pub mod aggregator;
pub mod count;
pub mod feed_rank;
pub mod ladder;
pub mod paged_rank;
pub mod presence;
pub mod traits;

pub use aggregator::*;
pub use count::*;
pub use feed_rank::*;
pub use ladder::*;
pub use paged_rank::*;
pub use presence::*;
pub use traits::*;
