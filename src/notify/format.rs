//! HTML message bodies for the Telegram sink.

use crate::notify::category::category_hashtag;
use crate::notify::Message;
use crate::types::{Direction, NewMarketEvent, SpikeEvent};

#[derive(Debug, Clone)]
pub struct Formatter {
    app_url: String,
}

impl Formatter {
    pub fn new(app_url: impl Into<String>) -> Self {
        let app_url: String = app_url.into();
        Self { app_url: app_url.trim_end_matches('/').to_string() }
    }

    pub fn trade_url(&self, market_id: &str, is_multi: bool) -> String {
        let mut url = format!("{}/detail?topicId={}", self.app_url, market_id);
        if is_multi {
            url.push_str("&type=multi");
        }
        url
    }

    pub fn new_market(&self, event: &NewMarketEvent) -> Message {
        let market = &event.market;
        let title = escape_html(&market.title);
        let category = category_hashtag(&market.title);

        let body = if !market.children.is_empty() {
            let options = market
                .children
                .iter()
                .map(|c| format!("• {}", escape_html(&c.title)))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "🔥 <b>{title}</b>\n\n\
                 <i>Multi-market:</i>\n\n\
                 {options}\n\n\
                 💡 Start trading on this new prediction market now.\n\n\
                 {category}"
            )
        } else {
            let is_hourly = market.title.contains("Hourly");
            let yes_label = market.yes_label.as_deref().unwrap_or("YES").to_uppercase();
            let no_label = market.no_label.as_deref().unwrap_or("NO").to_uppercase();
            let (yes_icon, no_icon) = if is_hourly {
                ("📈", "📉")
            } else if yes_label.contains("UP") {
                ("🟢", "🔵")
            } else if yes_label.contains("YES") {
                ("✅", "❌")
            } else {
                ("🔹", "🔸")
            };
            let kind = if is_hourly { "⏱ Hourly Bet" } else { "🎯 Single-market" };
            format!(
                "🔥 <b>{title}</b>\n\n\
                 <i>{kind}:</i>\n\n\
                 {yes_icon}: {yes}\n\
                 {no_icon}: {no}\n\n\
                 💡 Start trading on this new prediction market now.\n\n\
                 {category}",
                yes = escape_html(&yes_label),
                no = escape_html(&no_label),
            )
        };

        Message {
            body,
            action_url: self.trade_url(&market.id, event.is_multi),
        }
    }

    pub fn spike(&self, event: &SpikeEvent) -> Message {
        let inst = &event.instrument;
        let direction = match event.direction() {
            Direction::Up => "🟩 +",
            Direction::Down => "🟥 ",
        };
        let body = format!(
            "⚡️ <b>Significant Change Detected!</b>\n\n\
             {direction}{change:.2}% (1H) - <b>{title}</b>\n\n\
             📊 Current Probability: {prob:.1}%\n\
             💰 Volume 24h: ${volume}\n\n\
             💡 {category}",
            change = event.change_pct,
            title = escape_html(&inst.display_title),
            prob = event.current_price * 100.0,
            volume = format_thousands(inst.volume_24h),
            category = category_hashtag(&inst.display_title),
        );

        Message {
            body,
            action_url: self.trade_url(&inst.trade_target_id, inst.is_multi),
        }
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whole units with comma separators: 1234567.8 → "1,234,568".
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketSnapshot, TrackedInstrument};

    fn market(id: &str, title: &str) -> MarketSnapshot {
        MarketSnapshot {
            id: id.to_string(),
            title: title.to_string(),
            created_at: 0,
            resolved_at: Some(0),
            market_type: None,
            children: Vec::new(),
            yes_token_id: None,
            volume_24h: None,
            volume: None,
            yes_label: None,
            no_label: None,
        }
    }

    fn formatter() -> Formatter {
        Formatter::new("https://app.opinion.trade/")
    }

    #[test]
    fn trade_url_marks_multi_markets() {
        let f = formatter();
        assert_eq!(f.trade_url("42", false), "https://app.opinion.trade/detail?topicId=42");
        assert_eq!(f.trade_url("42", true), "https://app.opinion.trade/detail?topicId=42&type=multi");
    }

    #[test]
    fn multi_market_lists_children() {
        let mut parent = market("1", "Who wins the NBA final?");
        parent.children = vec![market("2", "Lakers"), market("3", "Celtics")];
        let msg = formatter().new_market(&NewMarketEvent { market: parent, is_multi: true });

        assert!(msg.body.contains("<i>Multi-market:</i>"));
        assert!(msg.body.contains("• Lakers\n• Celtics"));
        assert!(msg.body.ends_with("#Sports"));
        assert!(msg.action_url.ends_with("topicId=1&type=multi"));
    }

    #[test]
    fn single_market_icons_follow_labels() {
        let mut m = market("5", "ETH above 4k on Friday?");
        m.yes_label = Some("Up".to_string());
        m.no_label = Some("Down".to_string());
        let msg = formatter().new_market(&NewMarketEvent { market: m, is_multi: false });
        assert!(msg.body.contains("🎯 Single-market"));
        assert!(msg.body.contains("🟢: UP\n🔵: DOWN"));

        let plain = formatter().new_market(&NewMarketEvent { market: market("6", "Rain tomorrow?"), is_multi: false });
        assert!(plain.body.contains("✅: YES\n❌: NO"));
    }

    #[test]
    fn hourly_market_layout() {
        let msg = formatter().new_market(&NewMarketEvent {
            market: market("7", "BTC Hourly 14:00"),
            is_multi: false,
        });
        assert!(msg.body.contains("⏱ Hourly Bet"));
        assert!(msg.body.contains("📈: YES\n📉: NO"));
    }

    #[test]
    fn spike_message_carries_direction_and_volume() {
        let event = SpikeEvent {
            instrument: TrackedInstrument {
                instrument_id: "9".to_string(),
                display_title: "Election <2028> - Candidate A".to_string(),
                price_token_id: Some("tok".to_string()),
                volume_24h: 1_234_567.8,
                trade_target_id: "8".to_string(),
                market_id_hint: "9".to_string(),
                is_multi: true,
            },
            change_pct: -7.5,
            current_price: 0.372,
        };
        let msg = formatter().spike(&event);
        assert!(msg.body.contains("🟥 -7.50% (1H) - <b>Election &lt;2028&gt; - Candidate A</b>"));
        assert!(msg.body.contains("Current Probability: 37.2%"));
        assert!(msg.body.contains("Volume 24h: $1,234,568"));
        assert!(msg.body.contains("💡 #Politics"));
        assert_eq!(msg.action_url, "https://app.opinion.trade/detail?topicId=8&type=multi");
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(-12_345.0), "-12,345");
    }
}
