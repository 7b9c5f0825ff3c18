//! Time and progress projection.
//!
//! Pure functions of a ferment and the current time. Nothing here is stored;
//! callers pass `now` so views can recompute on every render and tests can
//! pin the clock.

use jiff::{SignedDuration, Timestamp};

use crate::model::Ferment;

/// Deviation from target beyond which a finished batch counts as early or
/// late rather than on target. Presentation only.
pub const ON_TARGET_TOLERANCE_HOURS: f64 = 2.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Time left until the predicted finish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Remaining {
    /// The predicted finish is still ahead.
    Left(SignedDuration),

    /// The predicted finish has passed: the batch is ready to harvest.
    Ready,
}

/// How the actual duration compares with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetVerdict {
    Early,
    OnTarget,
    Late,
}

/// Signed difference between elapsed and target hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    /// Positive when the batch ran longer than planned.
    pub hours: f64,
    pub verdict: OffsetVerdict,
}

/// Hours the batch has been fermenting.
///
/// Measured to `now` while fermenting and to `end_time` once ended. A
/// terminal record missing its end time is measured to `now`.
pub fn elapsed_hours(ferment: &Ferment, now: Timestamp) -> f64 {
    let end = match ferment.end_time {
        Some(end) if !ferment.is_fermenting() => end,
        _ => now,
    };
    hours_between(ferment.start_time, end)
}

/// When the batch reaches its target duration.
pub fn predicted_finish(ferment: &Ferment) -> Timestamp {
    let target = SignedDuration::try_from_secs_f64(ferment.target_hours * SECONDS_PER_HOUR)
        .unwrap_or(SignedDuration::MAX);
    ferment
        .start_time
        .checked_add(target)
        .unwrap_or(Timestamp::MAX)
}

/// Elapsed share of the target, clamped to `0..=100`.
pub fn progress_percent(ferment: &Ferment, now: Timestamp) -> f64 {
    let percent = elapsed_hours(ferment, now) / ferment.target_hours * 100.0;
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Time until the predicted finish. Never negative: a passed finish is
/// [`Remaining::Ready`].
pub fn time_remaining(ferment: &Ferment, now: Timestamp) -> Remaining {
    let left = predicted_finish(ferment).duration_since(now);
    if left.is_negative() {
        Remaining::Ready
    } else {
        Remaining::Left(left)
    }
}

/// A fermenting batch whose predicted finish has passed.
///
/// A display signal only; the record's status is unaffected.
pub fn is_overdue(ferment: &Ferment, now: Timestamp) -> bool {
    ferment.is_fermenting() && time_remaining(ferment, now) == Remaining::Ready
}

/// Elapsed minus target hours, with the early/on-target/late verdict.
pub fn offset_from_target(ferment: &Ferment, now: Timestamp) -> Offset {
    let hours = elapsed_hours(ferment, now) - ferment.target_hours;
    let verdict = if hours > ON_TARGET_TOLERANCE_HOURS {
        OffsetVerdict::Late
    } else if hours < -ON_TARGET_TOLERANCE_HOURS {
        OffsetVerdict::Early
    } else {
        OffsetVerdict::OnTarget
    };
    Offset { hours, verdict }
}

/// Every derived value for one batch at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub elapsed_hours: f64,
    pub progress_percent: f64,
    pub predicted_finish: Timestamp,
    pub remaining: Remaining,
    pub overdue: bool,
    pub offset: Offset,
}

impl Projection {
    pub fn of(ferment: &Ferment, now: Timestamp) -> Self {
        Self {
            elapsed_hours: elapsed_hours(ferment, now),
            progress_percent: progress_percent(ferment, now),
            predicted_finish: predicted_finish(ferment),
            remaining: time_remaining(ferment, now),
            overdue: is_overdue(ferment, now),
            offset: offset_from_target(ferment, now),
        }
    }
}

fn hours_between(start: Timestamp, end: Timestamp) -> f64 {
    end.duration_since(start).as_secs_f64() / SECONDS_PER_HOUR
}
