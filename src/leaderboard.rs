//! Client-side leaderboard derivations over a bounded fetch.

use crate::models::MatchRecord;

/// How many entries the top-voted ranking shows.
pub const TOP_LIMIT: usize = 10;
/// How many entries the most-recent ranking shows.
pub const RECENT_LIMIT: usize = 5;

/// Top matches by vote count, derived entirely from the fetched set.
/// The sort is stable, so ties keep whatever order the fetch returned;
/// tie order is not a contract.
pub fn top_matches(mut matches: Vec<MatchRecord>) -> Vec<MatchRecord> {
    matches.sort_by(|a, b| b.votes.cmp(&a.votes));
    matches.truncate(TOP_LIMIT);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::record_with_votes;

    #[test]
    fn ranks_by_votes_descending_regardless_of_fetch_order() {
        let fetched = vec![
            record_with_votes(5),
            record_with_votes(20),
            record_with_votes(1),
        ];

        let top = top_matches(fetched);
        let votes: Vec<u64> = top.iter().map(|m| m.votes).collect();
        assert_eq!(votes, vec![20, 5, 1]);
    }

    #[test]
    fn truncates_to_the_display_limit() {
        let fetched: Vec<_> = (0..25).map(|n| record_with_votes(n)).collect();
        let top = top_matches(fetched);
        assert_eq!(top.len(), TOP_LIMIT);
        assert_eq!(top[0].votes, 24);
    }

    #[test]
    fn empty_fetch_stays_empty() {
        assert!(top_matches(Vec::new()).is_empty());
    }
}
