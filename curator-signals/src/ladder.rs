//! Rank and count to score transforms

/// Step function from a 1-based rank to a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankLadder {
    /// (last rank of the step, score), ascending by rank
    steps: &'static [(usize, f64)],
}

impl RankLadder {
    /// Qiita popular-items feed
    pub const POPULAR_FEED: RankLadder = RankLadder {
        steps: &[(10, 100.0), (20, 70.0), (30, 40.0), (50, 20.0)],
    };

    /// Zenn weekly ranking
    pub const WEEKLY_RANKING: RankLadder = RankLadder {
        steps: &[(10, 100.0), (30, 80.0), (50, 60.0), (100, 40.0)],
    };

    /// Score for a rank; unranked and out-of-ladder ranks score 0
    pub fn score(&self, rank: Option<usize>) -> f64 {
        let Some(rank) = rank.filter(|r| *r >= 1) else {
            return 0.0;
        };
        self.steps
            .iter()
            .find(|(last, _)| rank <= *last)
            .map(|(_, score)| *score)
            .unwrap_or(0.0)
    }
}

/// `min(100, log10(count + 1) * 25)`
pub fn bookmark_score(count: u64) -> f64 {
    ((count as f64 + 1.0).log10() * 25.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popular_feed_boundaries() {
        let ladder = RankLadder::POPULAR_FEED;
        assert_eq!(ladder.score(Some(1)), 100.0);
        assert_eq!(ladder.score(Some(10)), 100.0);
        assert_eq!(ladder.score(Some(11)), 70.0);
        assert_eq!(ladder.score(Some(20)), 70.0);
        assert_eq!(ladder.score(Some(21)), 40.0);
        assert_eq!(ladder.score(Some(30)), 40.0);
        assert_eq!(ladder.score(Some(31)), 20.0);
        assert_eq!(ladder.score(Some(50)), 20.0);
        assert_eq!(ladder.score(Some(51)), 0.0);
        assert_eq!(ladder.score(None), 0.0);
        assert_eq!(ladder.score(Some(0)), 0.0);
    }

    #[test]
    fn test_weekly_ranking_boundaries() {
        let ladder = RankLadder::WEEKLY_RANKING;
        assert_eq!(ladder.score(Some(10)), 100.0);
        assert_eq!(ladder.score(Some(11)), 80.0);
        assert_eq!(ladder.score(Some(30)), 80.0);
        assert_eq!(ladder.score(Some(31)), 60.0);
        assert_eq!(ladder.score(Some(50)), 60.0);
        assert_eq!(ladder.score(Some(51)), 40.0);
        assert_eq!(ladder.score(Some(100)), 40.0);
        assert_eq!(ladder.score(Some(101)), 0.0);
    }

    #[test]
    fn test_bookmark_score() {
        assert_eq!(bookmark_score(0), 0.0);
        assert!((bookmark_score(99) - 50.0).abs() < 1e-9);
        assert!((bookmark_score(999) - 75.0).abs() < 1e-9);
        assert!((bookmark_score(9_999) - 100.0).abs() < 1e-9);
        assert_eq!(bookmark_score(1_000_000), 100.0);
        assert!((bookmark_score(100) - 101f64.log10() * 25.0).abs() < 1e-9);
    }
}
