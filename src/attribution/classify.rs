//! Manual-versus-scripted commit classification.
//!
//! Classification is an ordered rule list evaluated first-match-wins. Each
//! rule pairs a predicate over [`CommitSignals`] with a label and a reason
//! template, so rules can be tested one at a time and the order is explicit
//! in [`RULES`]. Commits no rule matches are [`Classification::Uncertain`].

use std::sync::LazyLock;

use regex::Regex;

use crate::attribution::Classification;

/// More changed rows than this is always scripted.
pub const ROW_COUNT_SCRIPTED: usize = 100;

/// At most this many changed rows can still be manual work.
pub const ROW_COUNT_MANUAL: usize = 50;

/// At most this many changed rows with a place name in the message is manual.
pub const ROW_COUNT_SMALL_WITH_LOCATION: usize = 20;

/// At most this many changed rows is manual regardless of other signals.
pub const ROW_COUNT_VERY_SMALL: usize = 5;

/// A gap shorter than this (seconds) marks a rapid-fire burst.
pub const TIME_GAP_SCRIPTED: i64 = 30;

/// A gap longer than this (seconds) supports manual editing.
pub const TIME_GAP_MANUAL: i64 = 300;

/// Thai place-name indicator tokens (province, district, subdistrict,
/// village, temple, school, pavilion).
pub const THAI_LOCATION_INDICATORS: [&str; 7] =
    ["จังหวัด", "อำเภอ", "ตำบล", "บ้าน", "วัด", "โรงเรียน", "ศาลา"];

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static BATCH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Add latitude/longitude for rows").unwrap());

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static ROW_RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rows?\s+\d+[-–\s]+\d+").unwrap());

/// Inputs to classification for a single commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSignals<'a> {
    /// Commit message subject.
    pub message: &'a str,
    /// Number of rows whose coordinates were added or changed.
    pub row_count: usize,
    /// Seconds since the previous commit, if there was one.
    pub time_gap: Option<i64>,
}

/// Outcome of classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Assigned label.
    pub label: Classification,
    /// Human-readable reason embedding the triggering counts.
    pub reason: String,
}

/// One entry of the classification rule list.
pub struct Rule {
    /// Stable rule name, also the prefix of the reason string.
    pub name: &'static str,
    /// Label assigned when the rule matches.
    pub label: Classification,
    predicate: fn(&CommitSignals<'_>) -> bool,
    reason: fn(&CommitSignals<'_>) -> String,
}

impl Rule {
    /// Returns true when the rule fires for `signals`.
    pub fn matches(&self, signals: &CommitSignals<'_>) -> bool {
        (self.predicate)(signals)
    }

    /// Builds the verdict this rule assigns.
    pub fn verdict(&self, signals: &CommitSignals<'_>) -> Verdict {
        Verdict {
            label: self.label,
            reason: (self.reason)(signals),
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Returns true when the message names a Thai place.
pub fn has_thai_location(message: &str) -> bool {
    THAI_LOCATION_INDICATORS
        .iter()
        .any(|indicator| message.contains(indicator))
}

fn gap_below(signals: &CommitSignals<'_>, threshold: i64) -> bool {
    signals.time_gap.is_some_and(|gap| gap < threshold)
}

fn gap_above(signals: &CommitSignals<'_>, threshold: i64) -> bool {
    signals.time_gap.is_some_and(|gap| gap > threshold)
}

fn gap_display(signals: &CommitSignals<'_>) -> i64 {
    signals.time_gap.unwrap_or_default()
}

/// Classification rules in priority order.
pub static RULES: [Rule; 7] = [
    Rule {
        name: "message_batch_pattern",
        label: Classification::Scripted,
        predicate: |s| BATCH_PATTERN.is_match(s.message),
        reason: |_| "message_batch_pattern".to_string(),
    },
    Rule {
        name: "message_row_range_pattern",
        label: Classification::Scripted,
        predicate: |s| ROW_RANGE_PATTERN.is_match(s.message),
        reason: |_| "message_row_range_pattern".to_string(),
    },
    Rule {
        name: "high_volume",
        label: Classification::Scripted,
        predicate: |s| s.row_count > ROW_COUNT_SCRIPTED,
        reason: |s| format!("high_volume ({} rows)", s.row_count),
    },
    Rule {
        name: "rapid_burst",
        label: Classification::Scripted,
        predicate: |s| s.row_count > ROW_COUNT_MANUAL && gap_below(s, TIME_GAP_SCRIPTED),
        reason: |s| format!("rapid_burst ({} rows, {}s)", s.row_count, gap_display(s)),
    },
    Rule {
        name: "small_thai_location",
        label: Classification::Manual,
        predicate: |s| s.row_count <= ROW_COUNT_SMALL_WITH_LOCATION && has_thai_location(s.message),
        reason: |s| format!("small_thai_location ({} rows)", s.row_count),
    },
    Rule {
        name: "medium_with_gap",
        label: Classification::Manual,
        predicate: |s| s.row_count <= ROW_COUNT_MANUAL && gap_above(s, TIME_GAP_MANUAL),
        reason: |s| format!("medium_with_gap ({} rows, {}s)", s.row_count, gap_display(s)),
    },
    Rule {
        name: "very_small",
        label: Classification::Manual,
        predicate: |s| s.row_count <= ROW_COUNT_VERY_SMALL,
        reason: |s| format!("very_small ({} rows)", s.row_count),
    },
];

/// Evaluates `rules` in order and returns the first match, or an uncertain
/// verdict when none fires.
pub fn classify_with(rules: &[Rule], signals: &CommitSignals<'_>) -> Verdict {
    rules
        .iter()
        .find(|rule| rule.matches(signals))
        .map_or_else(
            || Verdict {
                label: Classification::Uncertain,
                reason: format!("no_clear_signal ({} rows)", signals.row_count),
            },
            |rule| rule.verdict(signals),
        )
}

/// Classifies a commit with the standard [`RULES`].
pub fn classify(message: &str, row_count: usize, time_gap: Option<i64>) -> Verdict {
    classify_with(
        &RULES,
        &CommitSignals {
            message,
            row_count,
            time_gap,
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn very_small_change_is_manual() {
        let verdict = classify("fix typo", 3, Some(9999));
        assert_eq!(verdict.label, Classification::Manual);
        assert_eq!(verdict.reason, "medium_with_gap (3 rows, 9999s)");
    }

    #[test]
    fn very_small_change_without_gap_is_manual() {
        let verdict = classify("fix typo", 3, None);
        assert_eq!(verdict.label, Classification::Manual);
        insta::assert_snapshot!(verdict.reason, @"very_small (3 rows)");
    }

    #[test]
    fn high_volume_is_scripted() {
        let verdict = classify("bulk update", 150, Some(5));
        assert_eq!(verdict.label, Classification::Scripted);
        insta::assert_snapshot!(verdict.reason, @"high_volume (150 rows)");
    }

    #[test]
    fn batch_message_wins_regardless_of_row_count() {
        for rows in [0, 1, 30, 500] {
            let verdict = classify("Add latitude/longitude for rows 100-200", rows, Some(9999));
            assert_eq!(verdict.label, Classification::Scripted);
            assert_eq!(verdict.reason, "message_batch_pattern");
        }
    }

    #[test]
    fn row_range_message_is_scripted() {
        let verdict = classify("update rows 10 – 20", 2, None);
        assert_eq!(verdict.label, Classification::Scripted);
        assert_eq!(verdict.reason, "message_row_range_pattern");
    }

    #[test]
    fn rapid_burst_is_scripted() {
        let verdict = classify("more coords", 60, Some(10));
        assert_eq!(verdict.label, Classification::Scripted);
        insta::assert_snapshot!(verdict.reason, @"rapid_burst (60 rows, 10s)");
    }

    #[test]
    fn same_second_commit_counts_as_rapid_burst() {
        let verdict = classify("more coords", 60, Some(0));
        assert_eq!(verdict.label, Classification::Scripted);
        insta::assert_snapshot!(verdict.reason, @"rapid_burst (60 rows, 0s)");

        // Without a previous commit there is no gap at all.
        assert_eq!(classify("more coords", 60, None).label, Classification::Uncertain);
    }

    #[test]
    fn moderate_change_without_gap_is_uncertain() {
        let verdict = classify("more coords", 60, None);
        assert_eq!(verdict.label, Classification::Uncertain);
        assert_eq!(verdict.reason, "no_clear_signal (60 rows)");
    }

    #[test]
    fn thai_place_name_marks_small_change_manual() {
        let verdict = classify("แก้พิกัด โรงเรียนบ้านหนองบัว", 12, Some(5));
        assert_eq!(verdict.label, Classification::Manual);
        assert_eq!(verdict.reason, "small_thai_location (12 rows)");
    }

    #[test]
    fn medium_change_with_long_gap_is_manual() {
        let verdict = classify("coords", 40, Some(301));
        assert_eq!(verdict.label, Classification::Manual);
        assert_eq!(verdict.reason, "medium_with_gap (40 rows, 301s)");
    }

    #[test]
    fn gap_at_threshold_is_not_long() {
        let verdict = classify("coords", 40, Some(300));
        assert_eq!(verdict.label, Classification::Uncertain);
    }

    #[test]
    fn rule_order_is_stable() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "message_batch_pattern",
                "message_row_range_pattern",
                "high_volume",
                "rapid_burst",
                "small_thai_location",
                "medium_with_gap",
                "very_small",
            ]
        );
    }

    #[test]
    fn rules_can_be_evaluated_in_isolation() {
        let signals = CommitSignals {
            message: "x",
            row_count: 101,
            time_gap: None,
        };
        let high_volume = RULES.iter().find(|r| r.name == "high_volume").unwrap();
        assert!(high_volume.matches(&signals));
        assert!(!RULES[0].matches(&signals));
    }

    #[test]
    fn classify_with_custom_rules_falls_back_to_uncertain() {
        let verdict = classify_with(
            &[],
            &CommitSignals {
                message: "x",
                row_count: 1,
                time_gap: None,
            },
        );
        assert_eq!(verdict.label, Classification::Uncertain);
    }

    proptest! {
        #[test]
        fn classify_is_pure(
            message in ".{0,40}",
            rows in 0usize..500,
            gap in proptest::option::of(-10i64..5000),
        ) {
            let first = classify(&message, rows, gap);
            let second = classify(&message, rows, gap);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn more_than_high_volume_is_always_scripted(
            message in "[a-z ]{0,20}",
            rows in 101usize..10_000,
            gap in proptest::option::of(0i64..5000),
        ) {
            prop_assert_eq!(classify(&message, rows, gap).label, Classification::Scripted);
        }
    }
}
