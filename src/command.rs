//! Console command grammar.
//!
//! `interpret` turns one line into a [`Command`] without touching any state;
//! the session applies it. Flag parsing is forgiving: malformed or unknown
//! pairs are skipped and the rest of the line still applies.

use crate::settings::{parse_int, with_hash, ContentMode, DisplayTheme, Settings, SettingsDelta};
use std::panic::{self, AssertUnwindSafe};

pub const HELP_TEXT: &str = "Commands: config [--p val] [--r val] [--f val] [--a val] [--s hex] [--e hex] [--c hex] [--cr val] [--cx val] [--cy val] [--mode markdown|image], theme [dark|light|obsidian], export, reset";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Reset,
    Export,
    SetTheme(DisplayTheme),
    Configure(SettingsDelta),
}

/// Errors reported back to the console. `Display` is the user-facing text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Command not found.")]
    NotFound,
    #[error("Unknown theme '{0}'. Use dark, light or obsidian.")]
    UnknownTheme(String),
    #[error("Execution Error.")]
    Execution,
}

/// Parse one console line against the current settings
pub fn interpret(line: &str, current: &Settings) -> Result<Command, CommandError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let action = parts.first().map(|a| a.to_lowercase()).unwrap_or_default();

    match action.as_str() {
        "help" => Ok(Command::Help),
        "reset" => Ok(Command::Reset),
        "export" => Ok(Command::Export),
        "theme" => {
            let name = parts.get(1).copied().unwrap_or("");
            DisplayTheme::from_name(&name.to_lowercase())
                .map(Command::SetTheme)
                .ok_or_else(|| CommandError::UnknownTheme(name.to_string()))
        }
        "config" | "set" => Ok(Command::Configure(parse_flags(&parts[1..], current))),
        _ => Err(CommandError::NotFound),
    }
}

/// `interpret`, with any panic during parsing reported as `Execution Error.`
pub fn interpret_guarded(line: &str, current: &Settings) -> Result<Command, CommandError> {
    guarded(|| interpret(line, current))
}

fn guarded<F>(parse: F) -> Result<Command, CommandError>
where
    F: FnOnce() -> Result<Command, CommandError>,
{
    panic::catch_unwind(AssertUnwindSafe(parse)).unwrap_or_else(|_| {
        tracing::error!("Command parsing panicked");
        Err(CommandError::Execution)
    })
}

/// Walk `(flag, value)` pairs. A trailing flag without a value is dropped.
fn parse_flags(tokens: &[&str], current: &Settings) -> SettingsDelta {
    let mut delta = SettingsDelta::default();

    for pair in tokens.chunks_exact(2) {
        let (flag, val) = (pair[0], pair[1]);
        match flag {
            "--p" => delta.padding = Some(parse_int(val)),
            "--r" => delta.border_radius = Some(parse_int(val)),
            "--f" => delta.font_size = Some(parse_int(val)),
            "--a" => delta.gradient_angle = Some(parse_int(val)),
            "--mode" => {
                if let Some(mode) = ContentMode::from_name(val) {
                    delta.mode = Some(mode);
                }
            }
            "--s" => delta.gradient_start = Some(with_hash(val)),
            "--e" => delta.gradient_end = Some(with_hash(val)),
            "--c" => {
                delta.gradient_color_c = Some(with_hash(val));
                delta.use_color_c = Some(true);
            }
            "--cr" => delta.color_c_range = Some(parse_int(val)),
            // Both axes land on one position seeded from the current settings
            "--cx" => {
                delta
                    .color_c_position
                    .get_or_insert(current.color_c_position)
                    .x = parse_int(val)
            }
            "--cy" => {
                delta
                    .color_c_position
                    .get_or_insert(current.color_c_position)
                    .y = parse_int(val)
            }
            _ => {
                tracing::debug!("Skipping unknown flag {}", flag);
            }
        }
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Position;

    fn configure(line: &str, current: &Settings) -> SettingsDelta {
        match interpret(line, current) {
            Ok(Command::Configure(delta)) => delta,
            other => panic!("expected configure, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_actions() {
        let s = Settings::default();
        assert_eq!(interpret("help", &s), Ok(Command::Help));
        assert_eq!(interpret("  RESET ", &s), Ok(Command::Reset));
        assert_eq!(interpret("Export", &s), Ok(Command::Export));
    }

    #[test]
    fn test_unknown_action() {
        let s = Settings::default();
        let err = interpret("frobnicate --p 1", &s).unwrap_err();
        assert_eq!(err, CommandError::NotFound);
        assert_eq!(err.to_string(), "Command not found.");
        assert_eq!(interpret("", &s), Err(CommandError::NotFound));
    }

    #[test]
    fn test_theme() {
        let s = Settings::default();
        assert_eq!(interpret("theme obsidian", &s), Ok(Command::SetTheme(DisplayTheme::Obsidian)));
        assert_eq!(interpret("theme Light", &s), Ok(Command::SetTheme(DisplayTheme::Light)));
        assert_eq!(
            interpret("theme neon", &s),
            Err(CommandError::UnknownTheme("neon".into()))
        );
        assert!(matches!(interpret("theme", &s), Err(CommandError::UnknownTheme(_))));
    }

    #[test]
    fn test_config_padding_radius() {
        let delta = configure("config --p 80 --r 20", &Settings::default());
        assert_eq!(
            delta,
            SettingsDelta {
                padding: Some(80.0),
                border_radius: Some(20.0),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_set_alias_and_colors() {
        let delta = configure("set --s ff0000 --e #00ff00", &Settings::default());
        assert_eq!(delta.gradient_start.as_deref(), Some("#ff0000"));
        assert_eq!(delta.gradient_end.as_deref(), Some("#00ff00"));
    }

    #[test]
    fn test_accent_color_enables_accent() {
        let delta = configure("config --c fff", &Settings::default());
        assert_eq!(delta.gradient_color_c.as_deref(), Some("#fff"));
        assert_eq!(delta.use_color_c, Some(true));
    }

    #[test]
    fn test_position_flags_combine() {
        let mut current = Settings::default();
        current.color_c_position = Position { x: 5.0, y: 6.0 };

        let both = configure("config --cx 10 --cy 20", &current);
        assert_eq!(both.color_c_position, Some(Position { x: 10.0, y: 20.0 }));

        // The untouched axis is carried forward from the current settings
        let only_x = configure("config --cx 30", &current);
        assert_eq!(only_x.color_c_position, Some(Position { x: 30.0, y: 6.0 }));
    }

    #[test]
    fn test_forgiving_pairs() {
        let delta = configure("config --zzz 1 --f 18 --p", &Settings::default());
        assert_eq!(
            delta,
            SettingsDelta {
                font_size: Some(18.0),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_mode_flag() {
        let s = Settings::default();
        assert_eq!(configure("config --mode image", &s).mode, Some(ContentMode::Image));
        assert_eq!(configure("config --mode video", &s).mode, None);
    }

    #[test]
    fn test_non_numeric_value_writes_nan() {
        // Known sharp edge: the invalid value is written through, not rejected
        let delta = configure("config --p abc", &Settings::default());
        assert!(delta.padding.unwrap().is_nan());
    }

    #[test]
    fn test_panic_maps_to_execution_error() {
        let result = guarded(|| panic!("boom"));
        assert_eq!(result, Err(CommandError::Execution));
        assert_eq!(CommandError::Execution.to_string(), "Execution Error.");
    }
}
