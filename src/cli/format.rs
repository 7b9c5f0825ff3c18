//! Output formatting for CLI display.

use jiff::{Timestamp, tz::TimeZone};

use crate::model::{Details, FermentStatus, KefirKind};
use crate::projection::{Offset, OffsetVerdict, Remaining};

const BAR_WIDTH: usize = 10;

/// Hours with one decimal, e.g. `16.5h`.
pub(super) fn format_hours(hours: f64) -> String {
    format!("{hours:.1}h")
}

/// `3h 20m left`, or `ready to harvest` once the finish has passed.
pub(super) fn format_remaining(remaining: Remaining) -> String {
    match remaining {
        Remaining::Left(left) => {
            let secs = left.as_secs();
            format!("{}h {}m left", secs / 3600, (secs % 3600) / 60)
        }
        Remaining::Ready => "ready to harvest".to_string(),
    }
}

/// Signed offset with its verdict, e.g. `+6.0h (late)`.
pub(super) fn format_offset(offset: Offset) -> String {
    let sign = if offset.hours > 0.0 { "+" } else { "" };
    let verdict = match offset.verdict {
        OffsetVerdict::Early => "early",
        OffsetVerdict::OnTarget => "on target",
        OffsetVerdict::Late => "late",
    };
    format!("{sign}{:.1}h ({verdict})", offset.hours)
}

/// `[#####.....]  50%`
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(super) fn format_progress(percent: f64) -> String {
    let ratio = (percent / 100.0).clamp(0.0, 1.0);
    let filled = ((ratio * BAR_WIDTH as f64).floor() as usize).min(BAR_WIDTH);
    format!(
        "[{}{}] {percent:>3.0}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled)
    )
}

pub(super) fn format_status(status: FermentStatus) -> &'static str {
    match status {
        FermentStatus::Fermenting => "fermenting",
        FermentStatus::Finished => "harvested",
        FermentStatus::Archived => "stopped",
    }
}

/// Local wall-clock time, minute precision.
pub(super) fn format_time(ts: Timestamp) -> String {
    ts.to_zoned(TimeZone::system())
        .strftime("%Y-%m-%d %H:%M")
        .to_string()
}

/// Recipe lines for the batch's own kefir type. Absent values read as
/// unspecified; fields of the other type are ignored.
pub(super) fn format_recipe(kind: KefirKind, details: &Details) -> Vec<String> {
    match kind {
        KefirKind::Milk => vec![
            format!("Milk:   {}", text_or_unspecified(details.milk_type.as_deref())),
            format!("Volume: {}", amount_or_unspecified(details.milk_volume_ml, "ml")),
        ],
        KefirKind::Water => vec![
            format!("Sugar:  {}", text_or_unspecified(details.sugar_type.as_deref())),
            format!("Amount: {}", amount_or_unspecified(details.sugar_amount_g, "g")),
            format!("Water:  {}", amount_or_unspecified(details.water_volume_ml, "ml")),
        ],
    }
}

fn text_or_unspecified(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or("unspecified")
        .to_string()
}

fn amount_or_unspecified(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "unspecified".to_string(), |v| format!("{v} {unit}"))
}
