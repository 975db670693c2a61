//! Decoding of the feed's loosely-typed JSON. Ids and numbers arrive either as
//! JSON numbers or as strings depending on the endpoint.

use std::collections::HashSet;

use serde_json::Value;

use crate::types::MarketSnapshot;

/// Outcome of one listing page.
#[derive(Debug, PartialEq)]
pub enum ListPage {
    Markets(Vec<MarketSnapshot>),
    /// `errno != 0` or an unexpected envelope.
    ApiError(String),
}

/// Decode a `/market` listing response.
pub fn parse_list_page(resp: &Value) -> ListPage {
    if resp.get("errno").and_then(|e| e.as_i64()) != Some(0) {
        return ListPage::ApiError(resp.to_string());
    }
    let items = resp
        .get("result")
        .and_then(|r| r.get("list"))
        .and_then(|l| l.as_array())
        .cloned()
        .unwrap_or_default();

    ListPage::Markets(items.iter().filter_map(parse_market).collect())
}

/// Decode one market object. Returns `None` only when the id is missing.
pub fn parse_market(v: &Value) -> Option<MarketSnapshot> {
    let id = v.get("marketId").and_then(id_string)?;

    let title = v
        .get("marketTitle")
        .and_then(|t| t.as_str())
        .unwrap_or("Unknown Market")
        .to_string();

    let children = v
        .get("childMarkets")
        .and_then(|c| c.as_array())
        .map(|a| a.iter().filter_map(parse_market).collect())
        .unwrap_or_default();

    Some(MarketSnapshot {
        id,
        title,
        // Negative or unreadable creation times read as 0, which is always stale.
        created_at: v
            .get("createdAt")
            .and_then(as_i64_lenient)
            .filter(|t| *t >= 0)
            .unwrap_or(0),
        resolved_at: v.get("resolvedAt").and_then(as_i64_lenient),
        market_type: v.get("marketType").and_then(as_i64_lenient),
        children,
        yes_token_id: v.get("yesTokenId").and_then(id_string),
        volume_24h: v.get("volume24h").and_then(as_f64_lenient),
        volume: v.get("volume").and_then(as_f64_lenient),
        yes_label: non_empty_str(v.get("yesLabel")),
        no_label: non_empty_str(v.get("noLabel")),
    })
}

/// Drop repeated market ids, keeping the first occurrence and snapshot order.
pub fn dedup_markets(markets: Vec<MarketSnapshot>) -> Vec<MarketSnapshot> {
    let mut seen = HashSet::new();
    markets
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

/// Decode `/token/latest-price`. Only a strictly positive price counts.
pub fn parse_latest_price(resp: &Value) -> Option<f64> {
    if resp.get("errno").and_then(|e| e.as_i64()) != Some(0) {
        return None;
    }
    resp.get("result")
        .and_then(|r| r.get("price"))
        .and_then(as_f64_lenient)
        .filter(|p| *p > 0.0)
}

/// Decode the topic fallback: pick the yes or no price depending on which
/// position the token is.
pub fn parse_topic_price(resp: &Value, token_id: &str) -> Option<f64> {
    let data = resp.get("result")?.get("data")?;
    let side_price = |key: &str| {
        Some(data.get(key).and_then(as_f64_lenient).unwrap_or(0.0))
    };

    if data.get("yesPos").and_then(id_string).as_deref() == Some(token_id) {
        side_price("yesMarketPrice")
    } else if data.get("noPos").and_then(id_string).as_deref() == Some(token_id) {
        side_price("noMarketPrice")
    } else {
        None
    }
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i64_lenient(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| {
            v.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn as_f64_lenient(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|f: &f64| f.is_finite())
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_parent_with_children() {
        let raw = json!({
            "marketId": 101,
            "marketTitle": "Who wins?",
            "createdAt": 1_700_000_000,
            "resolvedAt": 0,
            "marketType": 1,
            "volume24h": "1500.5",
            "childMarkets": [
                {"marketId": "102", "marketTitle": "Alice", "resolvedAt": 0, "yesTokenId": "tok-a", "volume": 20},
                {"marketId": 103, "marketTitle": "Bob", "resolvedAt": 1_700_000_500}
            ]
        });
        let m = parse_market(&raw).expect("market");
        assert_eq!(m.id, "101");
        assert_eq!(m.created_at, 1_700_000_000);
        assert_eq!(m.volume_24h, Some(1500.5));
        assert_eq!(m.children.len(), 2);
        assert_eq!(m.children[0].id, "102");
        assert_eq!(m.children[0].yes_token_id.as_deref(), Some("tok-a"));
        assert_eq!(m.children[0].volume, Some(20.0));
        assert!(m.children[0].is_unresolved());
        assert!(!m.children[1].is_unresolved());
        assert!(m.is_multi());
    }

    #[test]
    fn out_of_range_creation_time_reads_as_zero() {
        for raw in [json!(-1e30), json!(1e30), json!(-5), json!("-1700000000")] {
            let m = parse_market(&json!({"marketId": "9", "createdAt": raw})).expect("market");
            assert_eq!(m.created_at, 0, "createdAt {raw}");
        }
        let m = parse_market(&json!({"marketId": "9", "createdAt": 1.7e9})).expect("market");
        assert_eq!(m.created_at, 1_700_000_000);
    }

    #[test]
    fn missing_fields_fall_back() {
        let m = parse_market(&json!({"marketId": "7"})).expect("market");
        assert_eq!(m.title, "Unknown Market");
        assert_eq!(m.created_at, 0);
        assert_eq!(m.resolved_at, None);
        assert!(m.children.is_empty());
        assert!(!m.is_unresolved());
        assert!(!m.is_multi());
    }

    #[test]
    fn market_without_id_is_dropped() {
        assert!(parse_market(&json!({"marketTitle": "no id"})).is_none());
    }

    #[test]
    fn list_page_reports_api_errors() {
        let page = parse_list_page(&json!({"errno": 10403, "errmsg": "rate limited"}));
        assert!(matches!(page, ListPage::ApiError(_)));

        let page = parse_list_page(&json!({"errno": 0, "result": {"list": [{"marketId": 1}, {"marketId": 2}]}}));
        match page {
            ListPage::Markets(m) => assert_eq!(m.len(), 2),
            other => panic!("expected markets, got {other:?}"),
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_order() {
        let ids = ["3", "1", "3", "2", "1"];
        let markets = ids
            .iter()
            .map(|id| parse_market(&json!({"marketId": id})).unwrap())
            .collect();
        let out: Vec<String> = dedup_markets(markets).into_iter().map(|m| m.id).collect();
        assert_eq!(out, vec!["3", "1", "2"]);
    }

    #[test]
    fn latest_price_requires_positive_value() {
        assert_eq!(parse_latest_price(&json!({"errno": 0, "result": {"price": "0.42"}})), Some(0.42));
        assert_eq!(parse_latest_price(&json!({"errno": 0, "result": {"price": "0"}})), None);
        assert_eq!(parse_latest_price(&json!({"errno": 1, "result": {"price": "0.42"}})), None);
    }

    #[test]
    fn topic_price_matches_position() {
        let resp = json!({"result": {"data": {
            "yesPos": "111", "noPos": 222,
            "yesMarketPrice": "0.61", "noMarketPrice": 0.39
        }}});
        assert_eq!(parse_topic_price(&resp, "111"), Some(0.61));
        assert_eq!(parse_topic_price(&resp, "222"), Some(0.39));
        assert_eq!(parse_topic_price(&resp, "333"), None);
    }
}
