//! Pressure classifier (C13): a pure function from a storage report and
//! an available-byte budget to one of five advisory levels.

use rblogs_contracts::report::{PressureLevel, PressureReport, StorageReport};

/// Classify `report`'s estimated footprint against `available_bytes`.
///
/// `usage_ratio` is `min(estimated_bytes / available_bytes, 1.0)`, or `1.0`
/// outright if `available_bytes <= 0` (spec.md §4.13). Level boundaries are
/// inclusive on their lower edge.
pub fn classify_pressure(report: &StorageReport, available_bytes: i64) -> PressureReport {
    let usage_ratio = if available_bytes <= 0 {
        1.0
    } else {
        (report.estimated_bytes as f64 / available_bytes as f64).min(1.0)
    };

    let (level, recommendation) = if usage_ratio < 0.5 {
        (PressureLevel::Normal, "No action needed.")
    } else if usage_ratio < 0.7 {
        (
            PressureLevel::Compact,
            "Consider compacting older spaces to reclaim headroom.",
        )
    } else if usage_ratio < 0.8 {
        (
            PressureLevel::ExportPrompt,
            "Export and archive cold spaces before usage climbs further.",
        )
    } else if usage_ratio < 0.9 {
        (
            PressureLevel::Aggressive,
            "Compact and export aggressively; storage is nearly exhausted.",
        )
    } else {
        (
            PressureLevel::Blocked,
            "Writes should be blocked until space is reclaimed.",
        )
    };

    PressureReport {
        level,
        usage_ratio,
        recommendation: recommendation.to_string(),
    }
}
