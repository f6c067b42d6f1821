use chrono::Utc;

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for events and the unrecognized-query log).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== Text Helpers ==============

/// Char-safe truncation used when echoing user text into logs.
pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
