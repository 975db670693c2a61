use crate::types::{MarketSnapshot, TrackedInstrument};

/// Flatten a snapshot into scan targets.
///
/// Resolved markets are skipped. A market without children is one instrument;
/// a parent contributes one instrument per unresolved child and is not priced
/// itself.
pub fn tracked_instruments(markets: &[MarketSnapshot]) -> Vec<TrackedInstrument> {
    let mut out = Vec::new();

    for market in markets.iter().filter(|m| m.is_unresolved()) {
        if market.children.is_empty() {
            out.push(TrackedInstrument {
                instrument_id: market.id.clone(),
                display_title: market.title.clone(),
                price_token_id: market.yes_token_id.clone(),
                volume_24h: market.volume_24h.unwrap_or(0.0),
                trade_target_id: market.id.clone(),
                market_id_hint: market.id.clone(),
                is_multi: false,
            });
            continue;
        }

        for child in market.children.iter().filter(|c| c.is_unresolved()) {
            out.push(TrackedInstrument {
                instrument_id: child.id.clone(),
                display_title: format!("{} - {}", market.title, child.title),
                price_token_id: child.yes_token_id.clone(),
                volume_24h: child_volume(child),
                trade_target_id: market.id.clone(),
                market_id_hint: child.id.clone(),
                is_multi: true,
            });
        }
    }

    out
}

/// First non-zero of the 24h volume and the lifetime volume.
fn child_volume(child: &MarketSnapshot) -> f64 {
    [child.volume_24h, child.volume]
        .into_iter()
        .flatten()
        .find(|v| *v != 0.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(id: &str, resolved_at: Option<i64>) -> MarketSnapshot {
        MarketSnapshot {
            id: id.to_string(),
            title: format!("T{id}"),
            created_at: 0,
            resolved_at,
            market_type: None,
            children: Vec::new(),
            yes_token_id: Some(format!("tok{id}")),
            volume_24h: None,
            volume: None,
            yes_label: None,
            no_label: None,
        }
    }

    #[test]
    fn leaf_market_is_one_instrument() {
        let mut m = market("1", Some(0));
        m.volume_24h = Some(250.0);
        let out = tracked_instruments(&[m]);
        assert_eq!(
            out,
            vec![TrackedInstrument {
                instrument_id: "1".to_string(),
                display_title: "T1".to_string(),
                price_token_id: Some("tok1".to_string()),
                volume_24h: 250.0,
                trade_target_id: "1".to_string(),
                market_id_hint: "1".to_string(),
                is_multi: false,
            }]
        );
    }

    #[test]
    fn parent_yields_only_unresolved_children() {
        let mut p = market("p", Some(0));
        let mut open = market("c1", Some(0));
        open.volume_24h = Some(0.0);
        open.volume = Some(75.0);
        p.children = vec![open, market("c2", Some(1_700_000_000))];

        let out = tracked_instruments(&[p]);
        assert_eq!(out.len(), 1);
        let inst = &out[0];
        assert_eq!(inst.instrument_id, "c1");
        assert_eq!(inst.display_title, "Tp - Tc1");
        assert_eq!(inst.trade_target_id, "p");
        assert_eq!(inst.market_id_hint, "c1");
        assert_eq!(inst.volume_24h, 75.0);
        assert!(inst.is_multi);
    }

    #[test]
    fn resolved_or_unknown_state_markets_are_skipped() {
        let out = tracked_instruments(&[market("r", Some(1_700_000_000)), market("u", None)]);
        assert!(out.is_empty());
    }

    #[test]
    fn missing_token_is_kept_for_the_scanner_to_skip() {
        let mut m = market("n", Some(0));
        m.yes_token_id = None;
        let out = tracked_instruments(&[m]);
        assert_eq!(out.len(), 1);
        assert!(out[0].price_token_id.is_none());
    }
}
