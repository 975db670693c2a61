//! New-market discovery: the set difference between the current snapshot and
//! markets already marked processed.

use std::collections::HashSet;

use crate::config::STALE_MARKET_SECS;
use crate::types::MarketSnapshot;

/// One top-level market seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovered<'a> {
    pub market: &'a MarketSnapshot,
    pub is_multi: bool,
    /// `false` for stale markets that are only marked, never announced.
    pub announce: bool,
}

impl Discovered<'_> {
    /// Processed markers for this market and every child, parent first.
    pub fn markers(&self) -> Vec<(&str, &str)> {
        std::iter::once(self.market)
            .chain(self.market.children.iter())
            .map(|m| (m.id.as_str(), m.title.as_str()))
            .collect()
    }
}

/// Ids listed under any parent. Children are never evaluated on their own.
pub fn child_ids(markets: &[MarketSnapshot]) -> HashSet<&str> {
    markets
        .iter()
        .flat_map(|m| m.children.iter().map(|c| c.id.as_str()))
        .collect()
}

/// Top-level ids that discovery needs a processed status for.
pub fn candidate_ids(markets: &[MarketSnapshot]) -> Vec<&str> {
    let children = child_ids(markets);
    markets
        .iter()
        .map(|m| m.id.as_str())
        .filter(|id| !children.contains(id))
        .collect()
}

/// Markets in `markets` not yet in `processed`, in snapshot order.
///
/// A market created more than 24h before `now` is returned with
/// `announce == false`: it is backfill, not news. A missing creation time
/// reads as 0 and therefore always as stale. Repeated ids within one snapshot
/// are reported once.
pub fn discover<'a>(
    markets: &'a [MarketSnapshot],
    processed: &HashSet<String>,
    now: i64,
) -> Vec<Discovered<'a>> {
    let children = child_ids(markets);
    let mut seen: HashSet<&str> = HashSet::new();

    markets
        .iter()
        .filter(|m| !children.contains(m.id.as_str()))
        .filter(|m| !processed.contains(&m.id))
        .filter(|m| seen.insert(m.id.as_str()))
        .map(|m| Discovered {
            market: m,
            is_multi: m.is_multi(),
            announce: now.saturating_sub(m.created_at) <= STALE_MARKET_SECS,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_750_000_000;

    fn market(id: &str, created_at: i64) -> MarketSnapshot {
        MarketSnapshot {
            id: id.to_string(),
            title: format!("Market {id}"),
            created_at,
            resolved_at: Some(0),
            market_type: Some(0),
            children: Vec::new(),
            yes_token_id: Some(format!("{id}-yes")),
            volume_24h: Some(100.0),
            volume: None,
            yes_label: None,
            no_label: None,
        }
    }

    fn parent(id: &str, created_at: i64, child_ids: &[&str]) -> MarketSnapshot {
        let mut m = market(id, created_at);
        m.children = child_ids.iter().map(|c| market(c, created_at)).collect();
        m
    }

    /// Apply the markers the way the coordinator does.
    fn mark_all(found: &[Discovered<'_>], processed: &mut HashSet<String>) {
        for d in found {
            for (id, _) in d.markers() {
                processed.insert(id.to_string());
            }
        }
    }

    #[test]
    fn second_pass_on_same_snapshot_finds_nothing() {
        let snapshot = vec![market("1", NOW - 60), parent("2", NOW - 60, &["2a", "2b"])];
        let mut processed = HashSet::new();

        let first = discover(&snapshot, &processed, NOW);
        assert_eq!(first.len(), 2);
        mark_all(&first, &mut processed);

        assert!(discover(&snapshot, &processed, NOW).is_empty());
    }

    #[test]
    fn stale_market_is_marked_but_not_announced() {
        let snapshot = vec![parent("old", NOW - 86_401, &["old-a"]), market("fresh", NOW - 86_400)];
        let found = discover(&snapshot, &HashSet::new(), NOW);

        assert_eq!(found.len(), 2);
        assert!(!found[0].announce);
        assert_eq!(found[0].markers(), vec![("old", "Market old"), ("old-a", "Market old-a")]);
        // exactly 24h old still counts as fresh
        assert!(found[1].announce);
    }

    #[test]
    fn missing_creation_time_is_never_announced() {
        let snapshot = vec![market("m", 0)];
        let found = discover(&snapshot, &HashSet::new(), NOW);
        assert_eq!(found.len(), 1);
        assert!(!found[0].announce);
    }

    #[test]
    fn extreme_creation_times_never_overflow_or_announce() {
        let snapshot = vec![market("min", i64::MIN), market("zero", 0)];
        let found = discover(&snapshot, &HashSet::new(), NOW);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|d| !d.announce));
    }

    #[test]
    fn malformed_feed_creation_time_is_stale() {
        let m = crate::feed::parse::parse_market(&serde_json::json!({
            "marketId": "x",
            "createdAt": -1e30,
        }))
        .expect("market");
        let snapshot = vec![m];
        let found = discover(&snapshot, &HashSet::new(), NOW);
        assert_eq!(found.len(), 1);
        assert!(!found[0].announce);
    }

    #[test]
    fn child_never_announced_independently() {
        // The child also appears as a top-level entry and is itself fresh.
        let snapshot = vec![parent("p", NOW - 10, &["c"]), market("c", NOW - 10)];
        let processed: HashSet<String> = ["p".to_string()].into_iter().collect();

        let found = discover(&snapshot, &processed, NOW);
        assert!(found.is_empty());
        assert_eq!(candidate_ids(&snapshot), vec!["p"]);
    }

    #[test]
    fn children_take_the_multi_path_regardless_of_type() {
        let mut typed_multi = market("t", NOW);
        typed_multi.market_type = Some(1);
        let snapshot = vec![parent("p", NOW, &["c"]), typed_multi, market("s", NOW)];

        let found = discover(&snapshot, &HashSet::new(), NOW);
        let multi: Vec<bool> = found.iter().map(|d| d.is_multi).collect();
        assert_eq!(multi, vec![true, true, false]);
    }

    #[test]
    fn duplicate_ids_reported_once_in_snapshot_order() {
        let snapshot = vec![market("b", NOW), market("a", NOW), market("b", NOW)];
        let ids: Vec<&str> = discover(&snapshot, &HashSet::new(), NOW)
            .iter()
            .map(|d| d.market.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
