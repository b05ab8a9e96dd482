//! Fix safety classification
//!
//! Deterministic, explainable policy, deliberately not ML-based. A fix is
//! safe when its diff is cosmetic (whitespace/comments) or a short
//! insertion-only single-line change backed by high confidence. It is unsafe
//! when the diff sprawls across non-contiguous hunks, touches a declaration
//! signature, or the source had low confidence in it. Everything else is
//! unknown, which auto-apply treats as unsafe (fail closed). Interactive
//! users can always override.

use crate::core::{EngineConfig, Fix, Issue, Safety};
use similar::{ChangeTag, TextDiff};

pub struct SafetyClassifier {
    safe_confidence_floor: f64,
    unsafe_confidence_ceiling: f64,
}

impl SafetyClassifier {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            safe_confidence_floor: config.safe_confidence_floor,
            unsafe_confidence_ceiling: config.unsafe_confidence_ceiling,
        }
    }

    pub fn classify(&self, fix: &Fix) -> Safety {
        if normalized(&fix.original_code) == normalized(&fix.fixed_code) {
            return Safety::Safe;
        }

        if fix.confidence < self.unsafe_confidence_ceiling {
            return Safety::Unsafe;
        }

        let hunks = line_diff(&fix.original_code, &fix.fixed_code);
        if hunks.len() > 1 {
            return Safety::Unsafe;
        }
        if hunks.iter().any(touches_signature) {
            return Safety::Unsafe;
        }

        if fix.confidence >= self.safe_confidence_floor {
            if let [hunk] = hunks.as_slice() {
                if is_mechanical_single_line(hunk) {
                    return Safety::Safe;
                }
            }
        }

        Safety::Unknown
    }

    /// Annotates every fix on every issue in place.
    pub fn annotate(&self, issues: &mut [Issue]) {
        for issue in issues {
            for fix in &mut issue.fixes {
                fix.safety = self.classify(fix);
            }
        }
    }
}

/// One contiguous changed region of a line diff.
#[derive(Debug)]
struct Hunk {
    removed: Vec<String>,
    added: Vec<String>,
}

/// Line-based diff with zero context lines; each op group is one contiguous
/// changed region.
fn line_diff(original: &str, fixed: &str) -> Vec<Hunk> {
    let diff = TextDiff::from_lines(original, fixed);
    let mut hunks = Vec::new();
    for group in diff.grouped_ops(0) {
        let mut hunk = Hunk {
            removed: Vec::new(),
            added: Vec::new(),
        };
        for op in &group {
            for change in diff.iter_changes(op) {
                let line = change.value();
                let line = line.strip_suffix('\n').unwrap_or(line);
                let line = line.strip_suffix('\r').unwrap_or(line);
                match change.tag() {
                    ChangeTag::Delete => hunk.removed.push(line.to_string()),
                    ChangeTag::Insert => hunk.added.push(line.to_string()),
                    ChangeTag::Equal => {}
                }
            }
        }
        if !(hunk.removed.is_empty() && hunk.added.is_empty()) {
            hunks.push(hunk);
        }
    }
    hunks
}

/// Strips comments and all whitespace; equal normalized forms mean the diff
/// is cosmetic.
fn normalized(code: &str) -> String {
    code.lines()
        .map(strip_comment)
        .collect::<String>()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn strip_comment(line: &str) -> String {
    let mut line = line.to_string();
    for marker in ["//", "#", "--"] {
        if let Some(pos) = line.find(marker) {
            line.truncate(pos);
        }
    }
    // Naive single-line block comment removal.
    while let (Some(open), Some(close)) = (line.find("/*"), line.find("*/")) {
        if close > open {
            line.replace_range(open..close + 2, "");
        } else {
            break;
        }
    }
    line
}

const SIGNATURE_KEYWORDS: &[&str] = &[
    "fn ", "def ", "class ", "function ", "func ", "impl ", "trait ", "struct ", "interface ",
];

fn touches_signature(hunk: &Hunk) -> bool {
    hunk.removed
        .iter()
        .chain(hunk.added.iter())
        .any(|line| is_signature_line(line))
}

fn is_signature_line(line: &str) -> bool {
    let mut trimmed = line.trim_start();
    for modifier in ["pub ", "export ", "async ", "static ", "abstract "] {
        trimmed = trimmed.strip_prefix(modifier).unwrap_or(trimmed);
    }
    SIGNATURE_KEYWORDS.iter().any(|k| trimmed.starts_with(k))
}

/// Allow-listed mechanical shape: one line replaced by one line where the
/// original text survives as a subsequence (insertion-only edit, e.g. adding
/// a missing default parameter or quoting a literal) and the insertion is
/// short.
fn is_mechanical_single_line(hunk: &Hunk) -> bool {
    const MAX_INSERTED: usize = 16;
    match (hunk.removed.as_slice(), hunk.added.as_slice()) {
        ([removed], [added]) => {
            let removed = removed.trim();
            let added = added.trim();
            added.len() > removed.len()
                && added.len() - removed.len() <= MAX_INSERTED
                && is_subsequence(removed, added)
        }
        _ => false,
    }
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut chars = needle.chars().peekable();
    for c in haystack.chars() {
        if chars.peek() == Some(&c) {
            chars.next();
        }
    }
    chars.peek().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;

    fn classifier() -> SafetyClassifier {
        SafetyClassifier::new(&EngineConfig::default())
    }

    fn fix(original: &str, fixed: &str, confidence: f64) -> Fix {
        Fix::new("test", original, fixed, confidence)
    }

    #[test]
    fn diff_groups_noncontiguous_changes_into_separate_hunks() {
        let hunks = line_diff("one\nkeep\ntwo\n", "ONE\nkeep\nTWO\n");
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].removed, vec!["one"]);
        assert_eq!(hunks[0].added, vec!["ONE"]);
        assert_eq!(hunks[1].removed, vec!["two"]);
    }

    #[test]
    fn diff_of_pure_insertion_has_an_empty_removed_side() {
        let hunks = line_diff("a\nb\n", "a\nnew\nb\n");
        assert_eq!(hunks.len(), 1);
        assert!(hunks[0].removed.is_empty());
        assert_eq!(hunks[0].added, vec!["new"]);
    }

    #[test]
    fn identical_inputs_produce_no_hunks() {
        assert!(line_diff("a\nb\n", "a\nb\n").is_empty());
        assert!(line_diff("", "").is_empty());
    }

    #[test]
    fn reindentation_is_safe_regardless_of_confidence() {
        let f = fix("if x:\n  do()\n", "if x:\n        do()\n", 0.2);
        assert_eq!(classifier().classify(&f), Safety::Safe);
    }

    #[test]
    fn comment_only_change_is_safe() {
        let f = fix("let x = 1; // old note\n", "let x = 1; // clearer note\n", 0.5);
        assert_eq!(classifier().classify(&f), Safety::Safe);
    }

    #[test]
    fn low_confidence_is_unsafe() {
        let f = fix("a = b\n", "a = c\n", 0.5);
        assert_eq!(classifier().classify(&f), Safety::Unsafe);
    }

    #[test]
    fn non_contiguous_hunks_are_unsafe() {
        let original = "one\nkeep\ntwo\n";
        let fixed = "ONE\nkeep\nTWO\n";
        let f = fix(original, fixed, 0.95);
        assert_eq!(classifier().classify(&f), Safety::Unsafe);
    }

    #[test]
    fn signature_change_is_unsafe() {
        let f = fix(
            "def handler(req):\n    return req\n",
            "def handler(req, ctx):\n    return req\n",
            0.95,
        );
        assert_eq!(classifier().classify(&f), Safety::Unsafe);
    }

    #[test]
    fn quoting_a_literal_with_high_confidence_is_safe() {
        let f = fix("level = warn\n", "level = \"warn\"\n", 0.95);
        assert_eq!(classifier().classify(&f), Safety::Safe);
    }

    #[test]
    fn adding_default_parameter_value_is_safe() {
        let f = fix("retries = \n", "retries = None\n", 0.95);
        assert_eq!(classifier().classify(&f), Safety::Safe);
    }

    #[test]
    fn mechanical_shape_without_high_confidence_is_unknown() {
        let f = fix("level = warn\n", "level = \"warn\"\n", 0.8);
        assert_eq!(classifier().classify(&f), Safety::Unknown);
    }

    #[test]
    fn single_line_rewrite_is_unknown_not_safe() {
        let f = fix("total = a + b\n", "total = a.saturating_add(b)\n", 0.95);
        assert_eq!(classifier().classify(&f), Safety::Unknown);
    }

    #[test]
    fn annotate_touches_every_fix() {
        let mut issues = vec![crate::core::Issue::new(
            "a.rs", 1, 1, crate::core::Severity::Low, "llm", "m",
        )
        .with_fix(fix("x\n", "y\n", 0.1))];
        classifier().annotate(&mut issues);
        assert_eq!(issues[0].fixes[0].safety, Safety::Unsafe);
    }
}
