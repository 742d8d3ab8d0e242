use serde::Serialize;
use std::collections::HashMap;
use std::collections::VecDeque;

/// Hard cap on results per query.
pub const MAX_RESULTS: usize = 10;

/// Builtin symbol universe for search. A dedicated symbol database would
/// replace this; the live-lookup fallback in the handler covers symbols
/// outside the table.
pub const STATIC_SYMBOLS: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("GOOGL", "Alphabet Inc."),
    ("AMZN", "Amazon.com Inc."),
    ("META", "Meta Platforms Inc."),
    ("TSLA", "Tesla Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("SPY", "SPDR S&P 500 ETF Trust"),
    ("QQQ", "Invesco QQQ Trust"),
    ("AMD", "Advanced Micro Devices Inc."),
    ("NFLX", "Netflix Inc."),
    ("DIS", "The Walt Disney Company"),
    ("BA", "The Boeing Company"),
    ("JPM", "JPMorgan Chase & Co."),
    ("V", "Visa Inc."),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub symbol: String,
    pub name: String,
}

/// Case-insensitive substring match against symbol and name columns of the
/// static table, capped at [`MAX_RESULTS`].
pub fn match_static(query: &str, table: &[(&str, &str)]) -> Vec<SearchResult> {
    let query_upper = query.to_uppercase();
    let query_lower = query.to_lowercase();

    table
        .iter()
        .filter(|(symbol, name)| {
            symbol.contains(&query_upper) || name.to_lowercase().contains(&query_lower)
        })
        .take(MAX_RESULTS)
        .map(|(symbol, name)| SearchResult {
            symbol: (*symbol).to_string(),
            name: (*name).to_string(),
        })
        .collect()
}

/// Bounded memo for search responses, keyed by exact uppercased query.
/// LRU eviction: a hit refreshes recency, an insert at capacity drops the
/// stalest key. Small enough that the VecDeque scan on touch is fine.
#[derive(Debug)]
pub struct SearchCache {
    capacity: usize,
    entries: HashMap<String, Vec<SearchResult>>,
    recency: VecDeque<String>,
}

impl SearchCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&mut self, query: &str) -> Option<Vec<SearchResult>> {
        let hit = self.entries.get(query).cloned()?;
        self.touch(query);
        Some(hit)
    }

    pub fn insert(&mut self, query: String, results: Vec<SearchResult>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.contains_key(&query) {
            self.touch(&query);
        } else {
            if self.entries.len() >= self.capacity {
                if let Some(stale) = self.recency.pop_front() {
                    self.entries.remove(&stale);
                }
            }
            self.recency.push_back(query.clone());
        }
        self.entries.insert(query, results);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, query: &str) {
        if let Some(pos) = self.recency.iter().position(|q| q == query) {
            self.recency.remove(pos);
            self.recency.push_back(query.to_string());
        }
    }
}
