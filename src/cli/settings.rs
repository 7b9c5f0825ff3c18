//! Display settings commands: show, set.

use clap::Subcommand;

use crate::config::{Config, DisplaySettings, Language, TextSize};

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print the current settings.
    Show,

    /// Change one or more settings.
    Set {
        #[arg(long, value_enum)]
        text_size: Option<TextSize>,

        #[arg(long, value_enum)]
        language: Option<Language>,

        /// Harvest reminders on or off.
        #[arg(long)]
        notifications: Option<bool>,
    },
}

pub(super) fn run(mut config: Config, command: SettingsCommand) -> Result<(), String> {
    match command {
        SettingsCommand::Show => {
            print_settings(&config.display);
            Ok(())
        }
        SettingsCommand::Set {
            text_size,
            language,
            notifications,
        } => {
            if !apply(&mut config.display, text_size, language, notifications) {
                return Err("nothing to change: pass --text-size, --language or --notifications"
                    .to_string());
            }
            config
                .save()
                .map_err(|e| format!("failed to save settings: {e}"))?;
            print_settings(&config.display);
            Ok(())
        }
    }
}

/// Applies the given changes. Returns whether anything was requested.
fn apply(
    display: &mut DisplaySettings,
    text_size: Option<TextSize>,
    language: Option<Language>,
    notifications: Option<bool>,
) -> bool {
    if let Some(size) = text_size {
        display.text_size = size;
    }
    if let Some(language) = language {
        display.language = language;
    }
    if let Some(on) = notifications {
        display.notifications = on;
    }
    text_size.is_some() || language.is_some() || notifications.is_some()
}

fn print_settings(display: &DisplaySettings) {
    for line in settings_lines(display) {
        println!("{line}");
    }
}

fn settings_lines(display: &DisplaySettings) -> [String; 3] {
    let text_size = match display.text_size {
        TextSize::Sm => "sm",
        TextSize::Md => "md",
        TextSize::Lg => "lg",
        TextSize::Xl => "xl",
    };
    let language = match display.language {
        Language::En => "en",
        Language::Th => "th",
    };
    let notifications = if display.notifications { "on" } else { "off" };
    [
        format!("text-size:     {text_size}"),
        format!("language:      {language}"),
        format!("notifications: {notifications}"),
    ]
}
