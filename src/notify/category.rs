/// Keyword table, checked in order; the first matching category wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "#Crypto",
        &[
            "bitcoin", "btc", "ethereum", "eth", "solana", "sol", "binance", "cz", "crypto",
            "usdt", "usdc", "token", "blockchain", "altcoin", "memecoin", "pepe", "doge", "dex",
            "wallet", "metamask", "base", "ton",
        ],
    ),
    (
        "#Politics",
        &[
            "election", "trump", "harris", "biden", "president", "senate", "government",
            "politics", "vote", "democrat", "republican", "white house",
        ],
    ),
    (
        "#Macro",
        &[
            "fed", "inflation", "cpi", "rate", "interest", "economy", "gdp", "recession", "gold",
            "oil", "unemployment", "fomc",
        ],
    ),
    ("#PreTGE", &["tge", "airdrop", "listing", "launch", "whitelist", "pre-market"]),
    (
        "#Business",
        &[
            "acquisition", "merger", "ceo", "startup", "stock", "ipo", "company", "revenue",
            "earnings", "valuation", "fdv",
        ],
    ),
    (
        "#Tech",
        &[
            "ai", "openai", "gpt", "nvidia", "tesla", "apple", "google", "meta", "software",
            "hardware", "chip", "robot", "cloud",
        ],
    ),
    (
        "#Sports",
        &[
            "football", "soccer", "basketball", "nba", "nfl", "champion", "match", "win",
            "league", "olympics", "final", "stadium",
        ],
    ),
    (
        "#Culture",
        &[
            "movie", "oscar", "music", "award", "celebrity", "grammy", "film", "art", "fashion",
            "show",
        ],
    ),
];

const DEFAULT_HASHTAG: &str = "#Opinion";

/// Hashtag for a market title, matching keywords on word boundaries.
pub fn category_hashtag(title: &str) -> &'static str {
    let lower = title.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_word(&lower, k)))
        .map(|(tag, _)| *tag)
        .unwrap_or(DEFAULT_HASHTAG)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `needle` occurs in `haystack` with no word character directly on either side.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start].chars().next_back().map_or(true, |c| !is_word_char(c));
        let after_ok = haystack[end..].chars().next().map_or(true, |c| !is_word_char(c));
        before_ok && after_ok
    })
}
