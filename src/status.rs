//! Classification of raw status strings into the fixed display taxonomy.

/// Raw status of a repository whose query has been spawned but has not answered yet.
pub const LOADING: &str = "loading";
/// Raw status of a repository whose query closed its output without writing anything.
pub const NO_RUNS: &str = "no_runs";
/// Raw status of a repository whose query could not be started.
pub const SPAWN_ERROR: &str = "spawn_error";

/// Display color of a status category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Failure,
    Neutral,
    Warning,
    Skipped,
    ActionRequired,
    Running,
}

impl Severity {
    /// Stable numeric code of the color pair, 1-based.
    pub fn code(self) -> u8 {
        match self {
            Severity::Success => 1,
            Severity::Failure => 2,
            Severity::Neutral => 3,
            Severity::Warning => 4,
            Severity::Skipped => 5,
            Severity::ActionRequired => 6,
            Severity::Running => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    /// Substring looked for in the raw status. Empty for the fallback entry.
    pub key: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
    pub severity: Severity,
}

const fn entry(
    key: &'static str,
    icon: &'static str,
    label: &'static str,
    severity: Severity,
) -> StatusEntry {
    StatusEntry {
        key,
        icon,
        label,
        severity,
    }
}

/// Ordered match table. The first key contained in a raw status wins, so the
/// order here decides strings that contain more than one key. The last entry
/// is the fallback and never matches by key.
pub static STATUS_TABLE: [StatusEntry; CATEGORY_COUNT] = [
    entry("success", "✅", "Conclusion: success", Severity::Success),
    entry("failure", "❌", "Conclusion: failure", Severity::Failure),
    entry("timed_out", "⌛", "Conclusion: timed out", Severity::Failure),
    entry("cancelled", "🛑", "Conclusion: cancelled", Severity::Warning),
    entry("skipped", "⏭️", "Conclusion: skipped", Severity::Skipped),
    entry("in_progress", "🔁", "Status: in progress", Severity::Running),
    entry("action_required", "⛔", "Status: action required", Severity::ActionRequired),
    entry("neutral", "⭕", "Conclusion: neutral", Severity::Neutral),
    entry("stale", "🥖", "Status: stale", Severity::Warning),
    entry("queued", "📋", "Status: queued", Severity::Neutral),
    entry(LOADING, "🌀", "Status: loading", Severity::Neutral),
    entry(NO_RUNS, "🚫", "Status: no runs", Severity::Neutral),
    entry("", "➖", "Unknown status", Severity::Neutral),
];

/// Number of categories, the fallback included.
pub const CATEGORY_COUNT: usize = 13;

/// Index of the fallback category in [`STATUS_TABLE`].
pub const UNKNOWN_CATEGORY: usize = CATEGORY_COUNT - 1;

/// Category index of a raw status.
pub fn category(raw: &str) -> usize {
    STATUS_TABLE[..UNKNOWN_CATEGORY]
        .iter()
        .position(|entry| raw.contains(entry.key))
        .unwrap_or(UNKNOWN_CATEGORY)
}

/// Map a raw status to its icon, label and severity.
pub fn classify(raw: &str) -> &'static StatusEntry {
    &STATUS_TABLE[category(raw)]
}

/// Human readable form of a raw status for tooltips: underscores become
/// spaces, and an empty status falls back to the category label.
pub fn describe(raw: &str) -> String {
    if raw.is_empty() {
        return classify(raw).label.to_string();
    }
    raw.replace('_', " ")
}

/// Count statuses per category, using the same first-match rule as [`classify`].
pub fn count_by_category<S: AsRef<str>>(statuses: &[S]) -> [usize; CATEGORY_COUNT] {
    let mut counts = [0; CATEGORY_COUNT];
    for status in statuses {
        counts[category(status.as_ref())] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_key_classifies_to_its_own_entry() {
        for (i, expected) in STATUS_TABLE[..UNKNOWN_CATEGORY].iter().enumerate() {
            assert_eq!(category(expected.key), i, "key {}", expected.key);
            assert_eq!(classify(expected.key), expected);
        }
    }

    #[test]
    fn icons_and_colors_match_table() {
        assert_eq!(classify("success").icon, "✅");
        assert_eq!(classify("success").severity.code(), 1);
        assert_eq!(classify("failure").icon, "❌");
        assert_eq!(classify("failure").severity.code(), 2);
        assert_eq!(classify("no_runs").icon, "🚫");
        assert_eq!(classify("no_runs").severity.code(), 3);
        assert_eq!(classify("in_progress null").severity.code(), 7);
    }

    #[test]
    fn unknown_and_empty_fall_back() {
        for raw in ["unknown", "", "completed", "spawn_error", "  "] {
            let entry = classify(raw);
            assert_eq!(entry.icon, "➖");
            assert_eq!(entry.label, "Unknown status");
            assert_eq!(entry.severity, Severity::Neutral);
        }
    }

    #[test]
    fn completed_success_is_success() {
        let entry = classify("completed success");
        assert_eq!(entry.icon, "✅");
        assert_eq!(entry.severity.code(), 1);
    }

    #[test]
    fn queued_with_empty_conclusion_is_queued() {
        assert_eq!(classify("queued ").label, "Status: queued");
    }

    #[test]
    fn first_table_entry_wins_over_string_position() {
        // "failure" is listed before "in_progress" no matter where it appears
        assert_eq!(classify("in_progress failure").key, "failure");
        assert_eq!(classify("queued cancelled").key, "cancelled");
        assert_eq!(classify("stale skipped").key, "skipped");
    }

    #[test]
    fn describe_replaces_underscores() {
        assert_eq!(describe("in_progress null"), "in progress null");
        assert_eq!(describe("no_runs"), "no runs");
    }

    #[test]
    fn describe_empty_uses_label() {
        assert_eq!(describe(""), "Unknown status");
    }

    #[test]
    fn counts_use_first_match() {
        let statuses = vec![
            "completed success".to_string(),
            "completed failure".to_string(),
            "loading".to_string(),
            "loading".to_string(),
            "garbage".to_string(),
        ];
        let counts = count_by_category(&statuses);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[1], 1);
        assert_eq!(counts[category(LOADING)], 2);
        assert_eq!(counts[UNKNOWN_CATEGORY], 1);
        assert_eq!(counts.iter().sum::<usize>(), statuses.len());
    }
}
