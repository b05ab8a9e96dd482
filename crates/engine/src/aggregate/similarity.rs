//! Message-signature similarity
//!
//! Two tools describing the same defect rarely agree on wording, so raw
//! string equality is useless for dedup. Messages are reduced to a token set
//! (lowercased, hedge words dropped) and compared with an overlap coefficient
//! where a token also matches any longer token it prefixes, so "deref" and
//! "dereference" count as the same signal.

use std::collections::BTreeSet;

/// Hedge and filler words that carry no defect identity.
const STOPWORDS: &[&str] = &[
    "possible", "possibly", "potential", "potentially", "likely", "may", "might", "risk", "risks",
    "warning", "error", "detected", "found", "here", "this", "the", "and", "with", "issue",
];

pub fn signature_tokens(message: &str) -> BTreeSet<String> {
    message
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Overlap ratio in [0,1] between two message signatures: matched tokens over
/// the smaller set. Empty signatures never match.
pub fn message_similarity(a: &str, b: &str) -> f64 {
    let ta = signature_tokens(a);
    let tb = signature_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let matched = ta.iter().filter(|t| tb.iter().any(|o| tokens_match(t, o))).count();

    matched as f64 / ta.len().min(tb.len()) as f64
}

/// Exact match, or one token is a prefix of the other (4+ chars so "int"
/// does not swallow "interface").
fn tokens_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= 4 && long.starts_with(short)
}
