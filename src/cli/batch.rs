//! Batch commands: new, list, show, harvest, stop, extend.

use clap::{Args, ValueEnum};
use jiff::Timestamp;

use crate::identity::User;
use crate::lifecycle::{Outcome, Tracker};
use crate::model::{Details, Ferment, KefirKind};
use crate::projection::{self, Projection};

use super::format::{
    format_hours, format_offset, format_progress, format_recipe, format_remaining, format_status,
    format_time,
};

/// CLI-facing kefir type, mapped to the domain `KefirKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Milk kefir (default 24 hours).
    Milk,
    /// Water kefir (default 96 hours).
    Water,
}

impl KindArg {
    fn to_domain(self) -> KefirKind {
        match self {
            Self::Milk => KefirKind::Milk,
            Self::Water => KefirKind::Water,
        }
    }
}

/// Optional recipe details. Only the ones matching the kefir type are kept.
#[derive(Debug, Clone, Default, Args)]
pub struct RecipeArgs {
    /// Milk used (milk kefir).
    #[arg(long)]
    pub milk_type: Option<String>,

    /// Milk volume in ml (milk kefir).
    #[arg(long)]
    pub milk_volume: Option<f64>,

    /// Sugar used (water kefir).
    #[arg(long)]
    pub sugar_type: Option<String>,

    /// Sugar amount in grams (water kefir).
    #[arg(long)]
    pub sugar_amount: Option<f64>,

    /// Water volume in ml (water kefir).
    #[arg(long)]
    pub water_volume: Option<f64>,
}

impl RecipeArgs {
    fn into_domain(self) -> Details {
        Details {
            milk_type: self.milk_type,
            milk_volume_ml: self.milk_volume,
            sugar_type: self.sugar_type,
            sugar_amount_g: self.sugar_amount,
            water_volume_ml: self.water_volume,
        }
    }
}

pub(super) fn cmd_new(
    tracker: &Tracker,
    user: &User,
    kind: KindArg,
    hours: Option<f64>,
    notes: Option<&str>,
    recipe: RecipeArgs,
) -> Result<(), String> {
    let kind = kind.to_domain();
    let hours = hours.unwrap_or_else(|| kind.default_hours());

    let (min, max) = kind.suggested_range();
    if hours < min || hours > max {
        eprintln!(
            "Note: {} usually ferments {min}-{max} hours; using {hours}.",
            kind.label()
        );
    }

    let ferment = tracker
        .create(
            &user.id,
            kind,
            hours,
            notes,
            recipe.into_domain(),
            Timestamp::now(),
        )
        .map_err(|e| format!("invalid batch: {e}"))?
        .ok_or("failed to save the new batch")?;

    println!("{}", ferment.id);
    Ok(())
}

pub(super) fn cmd_list(tracker: &Tracker, user: &User, now: Timestamp) {
    let ferments = tracker.list(&user.id);
    let (active, history): (Vec<&Ferment>, Vec<&Ferment>) =
        ferments.iter().partition(|f| f.is_fermenting());

    println!("Fermenting");
    if active.is_empty() {
        println!("  No active batches");
    }
    for f in &active {
        println!("  {}", active_line(f, now));
    }

    println!();
    println!("History");
    if history.is_empty() {
        println!("  No history");
    }
    for f in &history {
        println!("  {}", history_line(f));
    }
}

fn active_line(ferment: &Ferment, now: Timestamp) -> String {
    let p = Projection::of(ferment, now);
    let mut line = format!(
        "{:<8}  {:<11}  {}  {} elapsed  {}  (finish {})",
        ferment.id.short(),
        ferment.kind.label(),
        format_progress(p.progress_percent),
        format_hours(p.elapsed_hours),
        format_remaining(p.remaining),
        format_time(p.predicted_finish),
    );
    if p.overdue {
        line.push_str("  OVERDUE");
    }
    line
}

fn history_line(ferment: &Ferment) -> String {
    let duration = ferment.end_time.map_or_else(
        || "-".to_string(),
        |end| format_hours(projection::elapsed_hours(ferment, end)),
    );
    format!(
        "{:<8}  {:<11}  {:<10}  {duration}  started {}",
        ferment.id.short(),
        ferment.kind.label(),
        format_status(ferment.status),
        format_time(ferment.start_time),
    )
}

pub(super) fn cmd_show(ferment: &Ferment, now: Timestamp) {
    for line in detail_lines(ferment, now) {
        println!("{line}");
    }
}

fn detail_lines(ferment: &Ferment, now: Timestamp) -> Vec<String> {
    let p = Projection::of(ferment, now);
    let mut lines = vec![
        format!("{}  {}", ferment.id, ferment.kind.label()),
        format!("Status:  {}", format_status(ferment.status)),
        format!("Started: {}", format_time(ferment.start_time)),
        format!("Target:  {}", format_hours(ferment.target_hours)),
        format!("Elapsed: {}", format_hours(p.elapsed_hours)),
    ];

    if ferment.is_fermenting() {
        lines.push(format!("Progress: {}", format_progress(p.progress_percent)));
        lines.push(format!(
            "Finish:  {} ({})",
            format_time(p.predicted_finish),
            format_remaining(p.remaining)
        ));
    } else {
        if let Some(end) = ferment.end_time {
            lines.push(format!("Ended:   {}", format_time(end)));
        }
        lines.push(format!("Offset:  {}", format_offset(p.offset)));
    }

    lines.extend(format_recipe(ferment.kind, &ferment.details));
    if let Some(notes) = &ferment.notes {
        lines.push(format!("Notes:   {notes}"));
    }
    lines
}

pub(super) fn cmd_harvest(tracker: &Tracker, ferment: &Ferment, yes: bool) -> Result<(), String> {
    if !yes {
        return Err(format!(
            "harvesting {} ends the batch; re-run with --yes to confirm",
            ferment.id.short()
        ));
    }
    report(tracker.harvest(&ferment.id, Timestamp::now()), "harvested")
}

pub(super) fn cmd_stop(tracker: &Tracker, ferment: &Ferment, yes: bool) -> Result<(), String> {
    if !yes {
        return Err(format!(
            "stopping {} ends the batch; re-run with --yes to confirm",
            ferment.id.short()
        ));
    }
    report(tracker.stop(&ferment.id, Timestamp::now()), "stopped")
}

pub(super) fn cmd_extend(tracker: &Tracker, ferment: &Ferment, hours: f64) -> Result<(), String> {
    let outcome = tracker
        .extend(&ferment.id, hours)
        .map_err(|e| format!("cannot extend: {e}"))?;
    if let Outcome::Applied(f) = &outcome {
        eprintln!("Target now {}", format_hours(f.target_hours));
    }
    report(outcome, "extended")
}

/// Turns an outcome into the user-facing result.
fn report(outcome: Outcome, verb: &str) -> Result<(), String> {
    match outcome {
        Outcome::Applied(f) => {
            eprintln!("Batch {} {verb}", f.id.short());
            Ok(())
        }
        Outcome::NotFound => Err("batch not found".to_string()),
        Outcome::AlreadyEnded(status) => Err(format!(
            "batch was already {}; nothing changed",
            format_status(status)
        )),
        Outcome::Failed => Err("could not save the change; nothing changed".to_string()),
    }
}
