//! Saved themes: named style snapshots without text content.
//!
//! The collection is ordered newest-first and written back as a whole after
//! every change.

use crate::settings::{self, Settings, SettingsDelta};
use crate::storage::{self, KeyValueStore, THEMES_KEY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTheme {
    pub id: String,
    pub name: String,
    pub settings: SettingsDelta,
}

/// Why a theme file was rejected. The message is shown to the user as-is.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ImportError {
    #[error("Error parsing JSON file.")]
    Parse,
    #[error("Invalid theme file format.")]
    InvalidFormat,
}

pub struct ThemeStore {
    themes: Vec<SavedTheme>,
    store: Arc<dyn KeyValueStore>,
}

impl ThemeStore {
    /// Load saved themes. A malformed stored collection starts empty.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries: Vec<serde_json::Value> =
            storage::load_json_or_default(store.as_ref(), THEMES_KEY);
        // One unreadable entry must not take the rest of the collection with it
        let themes: Vec<SavedTheme> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(theme) => Some(theme),
                Err(e) => {
                    tracing::warn!("Skipping unreadable saved theme: {}", e);
                    None
                }
            })
            .collect();
        tracing::debug!("Loaded {} saved themes", themes.len());
        Self { themes, store }
    }

    pub fn themes(&self) -> &[SavedTheme] {
        &self.themes
    }

    pub fn get(&self, id: &str) -> Option<&SavedTheme> {
        self.themes.iter().find(|t| t.id == id)
    }

    /// Look a theme up by id first, then by case-insensitive name
    pub fn find(&self, id_or_name: &str) -> Option<&SavedTheme> {
        self.get(id_or_name).or_else(|| {
            self.themes
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(id_or_name))
        })
    }

    /// Snapshot `settings` (minus content) under `name`.
    ///
    /// Blank names are ignored and return `Ok(None)`.
    pub fn save(&mut self, name: &str, settings: &Settings) -> Result<Option<SavedTheme>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let theme = SavedTheme {
            id: self.next_id(),
            name: name.to_string(),
            settings: SettingsDelta::style_of(settings),
        };
        self.themes.insert(0, theme.clone());
        self.persist()?;
        tracing::info!("Saved theme '{}' ({})", theme.name, theme.id);
        Ok(Some(theme))
    }

    /// Remove a theme by id. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.themes.len();
        self.themes.retain(|t| t.id != id);
        let removed = self.themes.len() != before;
        if removed {
            self.persist()?;
            tracing::info!("Deleted theme {}", id);
        }
        Ok(removed)
    }

    /// Parse a theme file and prepend it under a fresh id.
    ///
    /// Any id in the payload is ignored. Storage failures are logged; the
    /// theme stays in the in-memory collection.
    pub fn import(&mut self, raw: &str) -> Result<SavedTheme, ImportError> {
        let json: serde_json::Value = serde_json::from_str(raw).map_err(|_| ImportError::Parse)?;

        let name = json
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
            .ok_or(ImportError::InvalidFormat)?
            .to_string();
        let raw_settings = json
            .get("settings")
            .and_then(|s| s.as_object())
            .ok_or(ImportError::InvalidFormat)?;
        let mut settings = lenient_settings(raw_settings);
        // Themes never carry text
        settings.content = None;

        let theme = SavedTheme {
            id: self.next_id(),
            name,
            settings,
        };
        self.themes.insert(0, theme.clone());
        if let Err(e) = self.persist() {
            tracing::error!("Failed to persist imported theme: {:#}", e);
        }
        tracing::info!("Imported theme '{}' ({})", theme.name, theme.id);
        Ok(theme)
    }

    fn persist(&self) -> Result<()> {
        storage::save_json(self.store.as_ref(), THEMES_KEY, &self.themes)
    }

    /// Millisecond timestamp, bumped past every numeric id already present
    fn next_id(&self) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let newest = self
            .themes
            .iter()
            .filter_map(|t| t.id.parse::<i64>().ok())
            .max()
            .unwrap_or(i64::MIN);
        now.max(newest.saturating_add(1)).to_string()
    }
}

/// Convert a settings object key by key. Fields with an unexpected type are
/// dropped; the rest of the theme still applies.
fn lenient_settings(raw: &serde_json::Map<String, serde_json::Value>) -> SettingsDelta {
    let mut kept = serde_json::Map::new();
    for (key, value) in raw {
        let single: serde_json::Map<_, _> = std::iter::once((key.clone(), value.clone())).collect();
        match serde_json::from_value::<SettingsDelta>(serde_json::Value::Object(single)) {
            Ok(_) => {
                kept.insert(key.clone(), value.clone());
            }
            Err(e) => tracing::warn!("Dropping theme field '{}': {}", key, e),
        }
    }
    serde_json::from_value(serde_json::Value::Object(kept)).unwrap_or_default()
}

/// Copy a theme's fields onto `settings`. Content is never touched.
pub fn apply(theme: &SavedTheme, settings: &mut Settings) {
    let mut style = theme.settings.clone();
    style.content = None;
    settings.apply(style);
}

/// Pretty-printed theme file contents
pub fn to_export_json(theme: &SavedTheme) -> Result<String> {
    serde_json::to_string_pretty(theme).context("Failed to serialize theme")
}

/// `glowsnap-theme-<name>.json`, lowercased, whitespace runs replaced by `-`
pub fn export_file_name(theme: &SavedTheme) -> String {
    let slug = theme
        .name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    format!("glowsnap-theme-{}.json", slug)
}

/// Write the theme file into `dir` and return its path
pub fn write_export(theme: &SavedTheme, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(export_file_name(theme));
    fs::write(&path, to_export_json(theme)?)
        .with_context(|| format!("Failed to write theme file {}", path.display()))?;
    tracing::info!("Exported theme '{}' to {:?}", theme.name, path);
    Ok(path)
}

/// Console command that reproduces the theme's style
pub fn cli_command(theme: &SavedTheme) -> String {
    settings::cli_command(&theme.settings)
}
