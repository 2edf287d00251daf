//! Session state shared by every input source.
//!
//! The session owns the canonical [`Settings`] and is the only place they are
//! mutated. Console commands, query parameters, cross-context messages and
//! interactive controls all end up here as a [`SettingsDelta`] or a command.

use crate::bridge;
use crate::command::{self, Command, HELP_TEXT};
use crate::export::{ArtifactSink, ExportTracker, Exporter, HandlerSlot, Snapshot};
use crate::query::{self, QueryOutcome};
use crate::settings::{Settings, SettingsDelta};
use crate::storage::KeyValueStore;
use crate::theme_store::{self, SavedTheme, ThemeStore};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type SharedSettings = Arc<Mutex<Settings>>;

/// Lock the shared settings, recovering the value if a writer panicked
pub fn lock_settings(settings: &SharedSettings) -> MutexGuard<'_, Settings> {
    settings.lock().unwrap_or_else(|e| e.into_inner())
}

/// Timing knobs for a session
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    /// Pause before capture so the surface can repaint
    pub export_settle: Duration,
    /// Pause between an image message and its export
    pub message_settle: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            export_settle: Duration::from_millis(600),
            message_settle: Duration::from_millis(800),
        }
    }
}

/// Cloneable handle on the settings and the export binding.
///
/// Background listeners hold one of these; the console holds the [`Session`].
#[derive(Clone)]
pub struct SessionCore {
    settings: SharedSettings,
    exporter: Exporter,
    slot: HandlerSlot,
    tracker: ExportTracker,
    timing: SessionTiming,
}

impl SessionCore {
    fn new(snapshot: Arc<dyn Snapshot>, sink: Arc<dyn ArtifactSink>, timing: SessionTiming) -> Self {
        let settings: SharedSettings = Arc::new(Mutex::new(Settings::default()));
        let tracker = ExportTracker::default();
        let exporter = Exporter::new(
            settings.clone(),
            snapshot,
            sink,
            timing.export_settle,
            tracker.clone(),
        );
        let core = Self {
            settings,
            exporter,
            slot: HandlerSlot::default(),
            tracker,
            timing,
        };
        core.rebind();
        core
    }

    /// Bind a fresh export handler. Called after every settings update.
    fn rebind(&self) {
        self.slot.bind(self.exporter.handler());
    }

    pub fn settings(&self) -> Settings {
        lock_settings(&self.settings).clone()
    }

    /// Apply a delta as one mutation
    pub fn update(&self, delta: SettingsDelta) {
        if delta.is_empty() {
            return;
        }
        lock_settings(&self.settings).apply(delta);
        self.rebind();
    }

    pub fn replace(&self, settings: Settings) {
        *lock_settings(&self.settings) = settings;
        self.rebind();
    }

    /// Drop the uploaded image. The mode is left as it is.
    pub fn clear_image(&self) {
        lock_settings(&self.settings).image_data = None;
        self.rebind();
    }

    /// Fire-and-forget export
    pub fn export(&self) -> JoinHandle<()> {
        tracing::info!("Export requested");
        self.exporter.spawn()
    }

    pub fn export_slot(&self) -> HandlerSlot {
        self.slot.clone()
    }

    pub fn tracker(&self) -> ExportTracker {
        self.tracker.clone()
    }

    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    /// Run one console command. `None` means success.
    pub fn execute(&self, line: &str) -> Option<String> {
        let current = self.settings();
        let command = match command::interpret_guarded(line, &current) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!("Command '{}' rejected: {}", line, e);
                return Some(e.to_string());
            }
        };

        match command {
            Command::Help => Some(HELP_TEXT.to_string()),
            Command::Reset => {
                self.replace(Settings::default());
                None
            }
            Command::Export => {
                self.export();
                None
            }
            Command::SetTheme(theme) => {
                self.update(SettingsDelta {
                    theme: Some(theme),
                    ..Default::default()
                });
                None
            }
            Command::Configure(delta) => {
                self.update(delta);
                None
            }
        }
    }
}

pub struct Session {
    core: SessionCore,
    themes: ThemeStore,
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        snapshot: Arc<dyn Snapshot>,
        sink: Arc<dyn ArtifactSink>,
        timing: SessionTiming,
    ) -> Self {
        Self {
            core: SessionCore::new(snapshot, sink, timing),
            themes: ThemeStore::load(store.clone()),
            store,
        }
    }

    pub fn core(&self) -> &SessionCore {
        &self.core
    }

    pub fn settings(&self) -> Settings {
        self.core.settings()
    }

    pub fn update(&self, delta: SettingsDelta) {
        self.core.update(delta)
    }

    pub fn execute(&self, line: &str) -> Option<String> {
        self.core.execute(line)
    }

    pub fn clear_image(&self) {
        self.core.clear_image()
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    /// Decode a scripted query string, apply it once and export if asked
    pub fn apply_query(&self, query_string: &str) -> QueryOutcome {
        let outcome = query::decode(query_string, self.store.as_ref());
        if !outcome.delta.is_empty() {
            tracing::info!("Applying settings from query string");
            self.core.update(outcome.delta.clone());
        }
        if outcome.export {
            self.core.export();
        }
        outcome
    }

    /// Register the cross-context message listener. Call once per session.
    pub fn listen(&self, messages: mpsc::UnboundedReceiver<serde_json::Value>) -> JoinHandle<()> {
        bridge::spawn_listener(messages, self.core.clone())
    }

    pub fn is_exporting(&self) -> bool {
        self.core.tracker.is_busy()
    }

    /// Resolves once no export is pending
    pub async fn wait_idle(&self) {
        self.core.tracker.wait_idle().await
    }

    pub fn themes(&self) -> &[SavedTheme] {
        self.themes.themes()
    }

    pub fn find_theme(&self, id_or_name: &str) -> Option<&SavedTheme> {
        self.themes.find(id_or_name)
    }

    pub fn save_theme(&mut self, name: &str) -> anyhow::Result<Option<SavedTheme>> {
        let settings = self.settings();
        self.themes.save(name, &settings)
    }

    pub fn apply_theme(&self, theme: &SavedTheme) {
        let mut settings = self.settings();
        theme_store::apply(theme, &mut settings);
        self.core.replace(settings);
        tracing::info!("Applied theme '{}'", theme.name);
    }

    pub fn delete_theme(&mut self, id: &str) -> anyhow::Result<bool> {
        self.themes.delete(id)
    }

    pub fn import_theme(&mut self, raw: &str) -> Result<SavedTheme, theme_store::ImportError> {
        self.themes.import(raw)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::export::testing::{MemorySink, RecordingSnapshot};
    use crate::storage::MemoryStore;

    pub struct Fixture {
        pub session: Session,
        pub store: Arc<MemoryStore>,
        pub snapshot: Arc<RecordingSnapshot>,
        pub sink: Arc<MemorySink>,
    }

    pub fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let snapshot = Arc::new(RecordingSnapshot::default());
        let sink = Arc::new(MemorySink::default());
        let session = Session::new(
            store.clone(),
            snapshot.clone(),
            sink.clone(),
            SessionTiming::default(),
        );
        Fixture {
            session,
            store,
            snapshot,
            sink,
        }
    }
}
