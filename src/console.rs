//! Interactive console.
//!
//! Plain lines go through the command grammar and are recorded in history.
//! Lines starting with `.` are local controls (themes, uploads, previews) that
//! stand in for the sidebar; they never reach the command interpreter.

use crate::clipboard;
use crate::command::HELP_TEXT;
use crate::history::CommandHistory;
use crate::markdown;
use crate::session::Session;
use crate::settings::{self, ContentMode, SettingsDelta};
use crate::theme_store::{self, SavedTheme};
use crate::upload;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of one submitted line, as shown to the user
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    None,
    Success(String),
    Error(String),
    Info(String),
}

const CONTROLS_HELP: &str = "Controls:
  .show                      Current style settings
  .preview                   Outline of the rendered content
  .text <line>               Replace content with one line
  .content <file>            Replace content with a file
  .image <file>              Upload an image and switch to image mode
  .clear-image               Remove the uploaded image
  .accent on|off             Toggle the radial accent
  .controls on|off           Toggle window controls
  .save <name>               Save the current style as a theme
  .themes                    List saved themes
  .apply <id|name>           Apply a saved theme
  .delete <id|name>          Delete a saved theme
  .import <file>             Import a theme file
  .export-theme <id|name> [dir]
                             Write a theme file (default: export directory)
  .cli [id|name]             Copy the config command for the current style or a theme
  .json <id|name>            Copy a theme's settings as JSON
  .history                   Recent commands
  .prev / .next              Step through history
  .run                       Run the recalled command
  .quit                      Exit";

pub struct Console {
    session: Session,
    history: CommandHistory,
    export_dir: PathBuf,
    recalled: Option<String>,
    running: bool,
}

impl Console {
    pub fn new(session: Session, mut history: CommandHistory, export_dir: PathBuf) -> Self {
        history.reset_navigation();
        Self {
            session,
            history,
            export_dir,
            recalled: None,
            running: true,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn submit(&mut self, input: &str) -> Feedback {
        let line = input.trim();
        if line.is_empty() {
            return Feedback::None;
        }
        if let Some(control) = line.strip_prefix('.') {
            return self.handle_dot_command(control);
        }

        if let Err(e) = self.history.record(line) {
            tracing::error!("Failed to save command history: {:#}", e);
        }
        self.history.reset_navigation();
        self.recalled = None;

        match self.session.execute(line) {
            None => Feedback::Success("Command executed".to_string()),
            Some(msg) if msg == HELP_TEXT => Feedback::Info(msg),
            Some(msg) => Feedback::Error(msg),
        }
    }

    fn handle_dot_command(&mut self, control: &str) -> Feedback {
        let (name, rest) = match control.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (control, ""),
        };

        match name {
            "quit" | "q" => {
                self.running = false;
                Feedback::Info("Exiting...".to_string())
            }
            "help" => Feedback::Info(format!("{}\n{}", HELP_TEXT, CONTROLS_HELP)),
            "show" => self.show(),
            "preview" => self.preview(),
            "text" => {
                self.session.update(SettingsDelta {
                    content: Some(rest.to_string()),
                    ..Default::default()
                });
                Feedback::Success("Content updated".to_string())
            }
            "content" => self.load_content(rest),
            "image" => self.upload_image(rest),
            "clear-image" => {
                self.session.clear_image();
                Feedback::Success("Image cleared".to_string())
            }
            "accent" => self.toggle(rest, |on| SettingsDelta {
                use_color_c: Some(on),
                ..Default::default()
            }),
            "controls" => self.toggle(rest, |on| SettingsDelta {
                show_window_controls: Some(on),
                ..Default::default()
            }),
            "save" => match self.session.save_theme(rest) {
                Ok(Some(theme)) => Feedback::Success(format!("Saved theme '{}' ({})", theme.name, theme.id)),
                Ok(None) => Feedback::Error("Theme name is required".to_string()),
                Err(e) => Feedback::Error(format!("Failed to save theme: {}", e)),
            },
            "themes" => self.list_themes(),
            "apply" => match self.theme(rest) {
                Ok(theme) => {
                    self.session.apply_theme(&theme);
                    Feedback::Success(format!("Applied theme '{}'", theme.name))
                }
                Err(feedback) => feedback,
            },
            "delete" => match self.theme(rest) {
                Ok(theme) => match self.session.delete_theme(&theme.id) {
                    Ok(_) => Feedback::Success(format!("Deleted theme '{}'", theme.name)),
                    Err(e) => Feedback::Error(format!("Failed to delete theme: {}", e)),
                },
                Err(feedback) => feedback,
            },
            "import" => self.import_theme(rest),
            "export-theme" => self.export_theme(rest),
            "cli" => self.cli_command(rest),
            "json" => match self.theme(rest) {
                Ok(theme) => match serde_json::to_string(&theme.settings) {
                    Ok(json) => Self::copied(json),
                    Err(e) => Feedback::Error(format!("Failed to serialize theme: {}", e)),
                },
                Err(feedback) => feedback,
            },
            "prev" => {
                self.recalled = self.history.previous().map(str::to_string);
                self.show_recalled()
            }
            "next" => {
                self.recalled = self.history.next().map(str::to_string);
                self.show_recalled()
            }
            "run" => match self.recalled.take() {
                Some(line) => self.submit(&line),
                None => Feedback::Error("Nothing recalled (use .prev)".to_string()),
            },
            "history" => {
                if self.history.is_empty() {
                    Feedback::Info("No command history".to_string())
                } else {
                    let lines: Vec<String> = self
                        .history
                        .entries()
                        .enumerate()
                        .map(|(i, cmd)| format!("{:>3}  {}", i + 1, cmd))
                        .collect();
                    Feedback::Info(lines.join("\n"))
                }
            }
            _ => Feedback::Error(format!("Unknown control: .{} (try .help)", name)),
        }
    }

    fn show(&self) -> Feedback {
        let settings = self.session.settings();
        let style = SettingsDelta::style_of(&settings);
        match serde_json::to_string_pretty(&style) {
            Ok(json) => Feedback::Info(format!(
                "{}\ncontent: {} lines{}",
                json,
                settings.content.split('\n').count(),
                if self.session.is_exporting() { "\n(export in progress)" } else { "" }
            )),
            Err(e) => Feedback::Error(format!("Failed to show settings: {}", e)),
        }
    }

    fn preview(&self) -> Feedback {
        let settings = self.session.settings();
        match settings.mode {
            ContentMode::Markdown => {
                Feedback::Info(markdown::outline(&markdown::render_blocks(&settings.content)))
            }
            ContentMode::Image => match settings.image_data {
                Some(data) => Feedback::Info(format!("[image, {} bytes]", data.len())),
                None => Feedback::Info("[image mode: no image uploaded]".to_string()),
            },
        }
    }

    fn load_content(&self, path: &str) -> Feedback {
        if path.is_empty() {
            return Feedback::Error("Usage: .content <file>".to_string());
        }
        match fs::read_to_string(path) {
            Ok(text) => {
                self.session.update(SettingsDelta {
                    content: Some(text),
                    ..Default::default()
                });
                Feedback::Success(format!("Loaded content from {}", path))
            }
            Err(e) => Feedback::Error(format!("Failed to read {}: {}", path, e)),
        }
    }

    fn upload_image(&self, path: &str) -> Feedback {
        if path.is_empty() {
            return Feedback::Error("Usage: .image <file>".to_string());
        }
        match upload::image_data_uri(Path::new(path)) {
            Ok(data) => {
                self.session.update(SettingsDelta {
                    image_data: Some(data),
                    mode: Some(ContentMode::Image),
                    ..Default::default()
                });
                Feedback::Success(format!("Image loaded from {}", path))
            }
            Err(e) => Feedback::Error(e.to_string()),
        }
    }

    fn toggle(&self, arg: &str, delta: impl Fn(bool) -> SettingsDelta) -> Feedback {
        let on = match arg {
            "on" => true,
            "off" => false,
            _ => return Feedback::Error("Expected on or off".to_string()),
        };
        self.session.update(delta(on));
        Feedback::Success(format!("Turned {}", arg))
    }

    fn list_themes(&self) -> Feedback {
        let themes = self.session.themes();
        if themes.is_empty() {
            return Feedback::Info("No saved themes".to_string());
        }
        let lines: Vec<String> = themes
            .iter()
            .map(|t| format!("{}  {}", t.id, t.name))
            .collect();
        Feedback::Info(lines.join("\n"))
    }

    fn theme(&self, id_or_name: &str) -> Result<SavedTheme, Feedback> {
        if id_or_name.is_empty() {
            return Err(Feedback::Error("A theme id or name is required".to_string()));
        }
        self.session
            .find_theme(id_or_name)
            .cloned()
            .ok_or_else(|| Feedback::Error(format!("No theme named '{}'", id_or_name)))
    }

    fn import_theme(&mut self, path: &str) -> Feedback {
        if path.is_empty() {
            return Feedback::Error("Usage: .import <file>".to_string());
        }
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => return Feedback::Error(format!("Failed to read {}: {}", path, e)),
        };
        match self.session.import_theme(&raw) {
            Ok(theme) => Feedback::Success(format!("Imported theme '{}' ({})", theme.name, theme.id)),
            Err(e) => Feedback::Error(e.to_string()),
        }
    }

    fn show_recalled(&self) -> Feedback {
        match &self.recalled {
            Some(line) => Feedback::Info(line.clone()),
            None => Feedback::Info(String::new()),
        }
    }

    /// `<id|name> [dir]`: the whole argument names the theme unless only a
    /// prefix does, in which case the last word is the target directory
    fn export_theme(&self, args: &str) -> Feedback {
        let (theme, dir) = match self.theme(args) {
            Ok(theme) => (theme, self.export_dir.clone()),
            Err(not_found) => match args.rsplit_once(char::is_whitespace) {
                Some((name, dir)) => match self.theme(name.trim()) {
                    Ok(theme) => (theme, PathBuf::from(dir)),
                    Err(_) => return not_found,
                },
                None => return not_found,
            },
        };
        match theme_store::write_export(&theme, &dir) {
            Ok(path) => Feedback::Success(format!("Theme written to {}", path.display())),
            Err(e) => Feedback::Error(format!("Failed to export theme: {}", e)),
        }
    }

    fn cli_command(&self, id_or_name: &str) -> Feedback {
        let command = if id_or_name.is_empty() {
            settings::cli_command(&SettingsDelta::style_of(&self.session.settings()))
        } else {
            match self.theme(id_or_name) {
                Ok(theme) => theme_store::cli_command(&theme),
                Err(feedback) => return feedback,
            }
        };

        Self::copied(command)
    }

    /// Copy to the clipboard, falling back to printing when there is none
    fn copied(text: String) -> Feedback {
        if clipboard::copy_command(&text) {
            Feedback::Success(format!("Copied: {}", text))
        } else {
            Feedback::Info(text)
        }
    }
}
