//! Summary statistics derived from a session's cracked-results set.
//!
//! These are recomputed on every `details()` call so they always reflect
//! the latest potfile cursor; nothing here is cached.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::session::CrackedHash;

/// How many of the most frequent passwords `details()` reports.
pub const TOP_PASSWORD_COUNT: usize = 10;

/// One entry of the top-passwords ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopPassword {
    pub password: String,
    pub count: u64,
}

/// Derived summary statistics over a cracked-results set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrackedStats {
    /// Top passwords by frequency, most frequent first.
    pub top_passwords: Vec<TopPassword>,
    /// Password length -> number of cracked passwords of that length.
    pub password_lengths: BTreeMap<usize, u64>,
    /// Character-class signature (see [`charset_signature`]) -> count.
    pub password_charsets: BTreeMap<String, u64>,
}

impl CrackedStats {
    /// Computes all statistics from the cracked set at call time.
    pub fn compute(cracked: &[CrackedHash]) -> Self {
        let mut frequency: HashMap<&str, u64> = HashMap::new();
        let mut lengths: BTreeMap<usize, u64> = BTreeMap::new();
        let mut charsets: BTreeMap<String, u64> = BTreeMap::new();

        for entry in cracked {
            *frequency.entry(entry.password.as_str()).or_default() += 1;
            *lengths.entry(entry.password.chars().count()).or_default() += 1;
            *charsets
                .entry(charset_signature(&entry.password))
                .or_default() += 1;
        }

        let mut ranked: Vec<(&str, u64)> = frequency.into_iter().collect();
        // Count descending, then lexicographic for a deterministic ranking.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(TOP_PASSWORD_COUNT);

        Self {
            top_passwords: ranked
                .into_iter()
                .map(|(password, count)| TopPassword {
                    password: password.to_string(),
                    count,
                })
                .collect(),
            password_lengths: lengths,
            password_charsets: charsets,
        }
    }
}

/// Builds the character-class signature of a password.
///
/// Classes appear in the fixed order `?l?u?d?s`, so "Pass1!" yields
/// `"?l?u?d?s"` and "hello" yields `"?l"`.
pub fn charset_signature(password: &str) -> String {
    let mut lower = false;
    let mut upper = false;
    let mut digit = false;
    let mut special = false;

    for c in password.chars() {
        if c.is_ascii_lowercase() {
            lower = true;
        } else if c.is_ascii_uppercase() {
            upper = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else {
            special = true;
        }
    }

    let mut signature = String::new();
    if lower {
        signature.push_str("?l");
    }
    if upper {
        signature.push_str("?u");
    }
    if digit {
        signature.push_str("?d");
    }
    if special {
        signature.push_str("?s");
    }
    signature
}

/// Percentage of hashes cracked, as reported in session summaries.
///
/// A zero denominator is defined as 0.0; session creation rejects empty
/// hash lists, so this only matters for externally constructed values.
pub fn cracked_percent(current_cracked: u64, total_hashes: u64) -> f64 {
    if total_hashes == 0 {
        return 0.0;
    }
    current_cracked as f64 * 100.0 / total_hashes as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(password: &str) -> CrackedHash {
        CrackedHash {
            username: None,
            password: password.to_string(),
            hash: format!("hash-of-{}", password),
        }
    }

    #[test]
    fn signature_orders_classes() {
        assert_eq!(charset_signature("hello"), "?l");
        assert_eq!(charset_signature("HELLO"), "?u");
        assert_eq!(charset_signature("1234"), "?d");
        assert_eq!(charset_signature("Pass1!"), "?l?u?d?s");
        assert_eq!(charset_signature("1a"), "?l?d");
        assert_eq!(charset_signature(""), "");
    }

    #[test]
    fn top_passwords_ranked_by_frequency_then_name() {
        let cracked = vec![
            entry("123456"),
            entry("123456"),
            entry("password"),
            entry("password"),
            entry("letmein"),
        ];
        let stats = CrackedStats::compute(&cracked);
        assert_eq!(stats.top_passwords.len(), 3);
        // Equal counts break ties lexicographically.
        assert_eq!(stats.top_passwords[0].password, "123456");
        assert_eq!(stats.top_passwords[1].password, "password");
        assert_eq!(stats.top_passwords[2].password, "letmein");
        assert_eq!(stats.top_passwords[0].count, 2);
    }

    #[test]
    fn top_passwords_truncated_to_ten() {
        let cracked: Vec<CrackedHash> =
            (0..25).map(|i| entry(&format!("pw{:02}", i))).collect();
        let stats = CrackedStats::compute(&cracked);
        assert_eq!(stats.top_passwords.len(), TOP_PASSWORD_COUNT);
    }

    #[test]
    fn length_and_charset_distributions() {
        let cracked = vec![entry("abc"), entry("abcd"), entry("a1c"), entry("XYZ")];
        let stats = CrackedStats::compute(&cracked);
        assert_eq!(stats.password_lengths.get(&3), Some(&3));
        assert_eq!(stats.password_lengths.get(&4), Some(&1));
        assert_eq!(stats.password_charsets.get("?l"), Some(&2));
        assert_eq!(stats.password_charsets.get("?l?d"), Some(&1));
        assert_eq!(stats.password_charsets.get("?u"), Some(&1));
    }

    #[test]
    fn percent_boundaries() {
        assert_eq!(cracked_percent(0, 10), 0.0);
        assert_eq!(cracked_percent(10, 10), 100.0);
        assert_eq!(cracked_percent(1, 4), 25.0);
        assert_eq!(cracked_percent(0, 0), 0.0);
        assert_eq!(cracked_percent(5, 0), 0.0);
    }

    #[test]
    fn stats_on_empty_set_are_empty() {
        let stats = CrackedStats::compute(&[]);
        assert!(stats.top_passwords.is_empty());
        assert!(stats.password_lengths.is_empty());
        assert!(stats.password_charsets.is_empty());
    }
}
