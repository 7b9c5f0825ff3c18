//! CLI interface for the kefir tracker.
//!
//! Each subcommand is non-interactive: arguments in, plain text out.
//! Batch commands require a signed-in user; see `identity` for how that is
//! resolved in each deployment mode.
//!
//! Batch ids take a full id or an unambiguous prefix, as printed by `list`.

mod batch;
mod format;
mod session;
mod settings;

use clap::{ArgAction, Parser, Subcommand};
use jiff::Timestamp;

use crate::config::{Config, DeploymentMode};
use crate::identity::{ConfiguredSession, DemoSession, Session, User};
use crate::lifecycle::Tracker;
use crate::model::{Ferment, FermentId};
use crate::storage;

use batch::{KindArg, RecipeArgs};
use settings::SettingsCommand;

/// Track milk and water kefir batches.
#[derive(Debug, Parser)]
#[command(name = "kefir", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Act as this user (relational mode only).
    #[arg(long = "as", global = true)]
    identity: Option<String>,

    /// Show debug logging.
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true, action = ArgAction::SetTrue, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: one batch of milk kefir
  1. kefir login you@example.com
     kefir login you@example.com --code 123456   (demo mode code)
  2. kefir new milk --hours 24 --milk-type whole --milk-volume 500
     → prints a batch ID (e.g. a3b0fc12)
  3. kefir list
  4. kefir extend a3b 4
  5. kefir harvest a3b --yes

Demo mode keeps everything in ~/.kefir/. Set KEFIR_DATABASE (or `database`
in ~/.kefir/config.toml) to use a SQLite database instead.";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with a one-time code sent to your email.
    ///
    /// Without `--code`, requests a code. With `--code`, verifies it.
    Login {
        email: String,

        /// The code from the email.
        #[arg(long)]
        code: Option<String>,
    },

    /// Sign out.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Start a new batch. Prints the batch ID.
    New {
        /// Milk or water kefir.
        #[arg(value_enum)]
        kind: KindArg,

        /// Target duration in hours (defaults: milk 24, water 96).
        #[arg(long)]
        hours: Option<f64>,

        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,

        #[command(flatten)]
        recipe: RecipeArgs,
    },

    /// List fermenting batches, then history.
    List,

    /// Show one batch in detail.
    Show {
        /// Batch ID: full ID or unambiguous prefix.
        id: String,
    },

    /// Harvest a batch: it is done.
    Harvest {
        /// Batch ID: full ID or unambiguous prefix.
        id: String,

        /// Confirm. Harvesting cannot be undone.
        #[arg(long)]
        yes: bool,
    },

    /// Stop a batch early and archive it.
    Stop {
        /// Batch ID: full ID or unambiguous prefix.
        id: String,

        /// Confirm. Stopping cannot be undone.
        #[arg(long)]
        yes: bool,
    },

    /// Let a batch ferment longer.
    Extend {
        /// Batch ID: full ID or unambiguous prefix.
        id: String,

        /// Hours to add to the target.
        #[arg(allow_negative_numbers = true)]
        hours: f64,
    },

    /// Show or change display settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli, config: Config, mode: &DeploymentMode) -> Result<(), String> {
    let session = open_session(mode, cli.identity, config.identity.clone());

    match cli.command {
        Command::Login { email, code } => session::cmd_login(&*session, &email, code.as_deref()),
        Command::Logout => session::cmd_logout(&*session),
        Command::Whoami => session::cmd_whoami(&*session, mode),
        Command::Settings { command } => settings::run(config, command),
        Command::New {
            kind,
            hours,
            notes,
            recipe,
        } => {
            let user = require_user(&*session)?;
            let tracker = open_tracker(mode)?;
            batch::cmd_new(&tracker, &user, kind, hours, notes.as_deref(), recipe)
        }
        Command::List => {
            let user = require_user(&*session)?;
            let tracker = open_tracker(mode)?;
            batch::cmd_list(&tracker, &user, Timestamp::now());
            Ok(())
        }
        Command::Show { id } => {
            let user = require_user(&*session)?;
            let tracker = open_tracker(mode)?;
            let ferment = resolve_ferment(&tracker, &user, &id)?;
            batch::cmd_show(&ferment, Timestamp::now());
            Ok(())
        }
        Command::Harvest { id, yes } => {
            let user = require_user(&*session)?;
            let tracker = open_tracker(mode)?;
            let ferment = resolve_ferment(&tracker, &user, &id)?;
            batch::cmd_harvest(&tracker, &ferment, yes)
        }
        Command::Stop { id, yes } => {
            let user = require_user(&*session)?;
            let tracker = open_tracker(mode)?;
            let ferment = resolve_ferment(&tracker, &user, &id)?;
            batch::cmd_stop(&tracker, &ferment, yes)
        }
        Command::Extend { id, hours } => {
            let user = require_user(&*session)?;
            let tracker = open_tracker(mode)?;
            let ferment = resolve_ferment(&tracker, &user, &id)?;
            batch::cmd_extend(&tracker, &ferment, hours)
        }
    }
}

fn open_session(
    mode: &DeploymentMode,
    explicit: Option<String>,
    configured: Option<String>,
) -> Box<dyn Session> {
    match mode {
        DeploymentMode::Demo { root } => Box::new(DemoSession::new(root)),
        DeploymentMode::Relational { .. } => Box::new(ConfiguredSession::new(explicit, configured)),
    }
}

fn open_tracker(mode: &DeploymentMode) -> Result<Tracker, String> {
    let store = storage::open(mode).map_err(|e| format!("failed to open storage: {e}"))?;
    Ok(Tracker::new(store))
}

/// The signed-in user, or an error pointing at `kefir login`.
fn require_user(session: &dyn Session) -> Result<User, String> {
    session
        .current_user()
        .map_err(|e| format!("failed to read session: {e}"))?
        .ok_or_else(|| "not signed in: run `kefir login <email>` first".to_string())
}

/// Resolve a batch reference (full ID or unambiguous prefix) among the
/// user's own batches.
fn resolve_ferment(tracker: &Tracker, user: &User, reference: &str) -> Result<Ferment, String> {
    if reference.is_empty() {
        return Err("batch ID cannot be empty".to_string());
    }

    // Try the full ID first.
    if let Some(ferment) = tracker.get(&FermentId::new(reference))
        && ferment.owner == user.id
    {
        return Ok(ferment);
    }

    // Then as a prefix of the user's batches.
    let ferments = tracker.list(&user.id);
    let mut matches: Vec<Ferment> = ferments
        .into_iter()
        .filter(|f| f.id.as_str().starts_with(reference))
        .collect();

    match matches.len() {
        0 => Err(format!("no batch matching '{reference}'")),
        1 => Ok(matches.remove(0)),
        n => {
            let ids: Vec<&str> = matches.iter().map(|f| f.id.short()).collect();
            Err(format!(
                "'{reference}' is ambiguous: matches {n} batches: {}",
                ids.join(", ")
            ))
        }
    }
}
