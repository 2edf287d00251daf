//! Export pipeline: wait for the surface to settle, capture it, write the artifact.
//!
//! Capture itself is an external capability behind [`Snapshot`]. Failures are
//! logged and dropped; nothing is retried and an export cannot be cancelled.

use crate::session::{lock_settings, SharedSettings};
use crate::surface::RenderSurface;
use anyhow::{bail, Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns a render surface into an encoded image buffer
pub trait Snapshot: Send + Sync {
    /// File extension of the produced artifact
    fn extension(&self) -> &str;
    fn capture<'a>(&'a self, surface: &'a RenderSurface) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Destination for finished artifacts
pub trait ArtifactSink: Send + Sync {
    fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Snapshot stand-in that serializes the surface description as pretty JSON
pub struct SurfaceDump;

impl Snapshot for SurfaceDump {
    fn extension(&self) -> &str {
        "json"
    }

    fn capture<'a>(&'a self, surface: &'a RenderSurface) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            serde_json::to_vec_pretty(surface).context("Failed to serialize render surface")
        })
    }
}

/// Writes artifacts into a directory, creating it on first use
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create export directory {}", self.dir.display()))?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Counts exports (and delayed message exports) still in flight
#[derive(Clone, Default)]
pub struct ExportTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Default)]
struct TrackerInner {
    pending: AtomicUsize,
    idle: Notify,
}

/// Held for the lifetime of one pending export
pub struct PendingExport {
    inner: Arc<TrackerInner>,
}

impl Drop for PendingExport {
    fn drop(&mut self) {
        if self.inner.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl ExportTracker {
    pub fn begin(&self) -> PendingExport {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        PendingExport {
            inner: self.inner.clone(),
        }
    }

    /// True while an export is waiting or capturing
    pub fn is_busy(&self) -> bool {
        self.inner.pending.load(Ordering::SeqCst) > 0
    }

    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if !self.is_busy() {
                return;
            }
            notified.await;
        }
    }
}

/// Export action as seen by asynchronous callers
pub type ExportHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Process-wide cell holding the latest export handler.
///
/// Rebound on every settings update; readers always call whatever is bound at
/// the moment they run.
#[derive(Clone, Default)]
pub struct HandlerSlot {
    current: Arc<Mutex<Option<ExportHandler>>>,
}

impl HandlerSlot {
    pub fn bind(&self, handler: ExportHandler) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = Some(handler);
    }

    pub fn current(&self) -> Option<ExportHandler> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[derive(Clone)]
pub struct Exporter {
    settings: SharedSettings,
    snapshot: Arc<dyn Snapshot>,
    sink: Arc<dyn ArtifactSink>,
    settle: Duration,
    tracker: ExportTracker,
}

impl Exporter {
    pub fn new(
        settings: SharedSettings,
        snapshot: Arc<dyn Snapshot>,
        sink: Arc<dyn ArtifactSink>,
        settle: Duration,
        tracker: ExportTracker,
    ) -> Self {
        Self {
            settings,
            snapshot,
            sink,
            settle,
            tracker,
        }
    }

    /// Start an export in the background and return immediately
    pub fn spawn(&self) -> JoinHandle<()> {
        let pending = self.tracker.begin();
        let exporter = self.clone();
        tokio::spawn(async move {
            exporter.run().await;
            drop(pending);
        })
    }

    /// Wait for the settling delay, then capture whatever the settings are now
    pub async fn run(&self) {
        let _pending = self.tracker.begin();
        tokio::time::sleep(self.settle).await;

        let surface = RenderSurface::compose(&lock_settings(&self.settings));
        match self.capture(&surface).await {
            Ok(path) => tracing::info!("Exported snapshot to {:?}", path),
            Err(e) => tracing::error!("Export failed: {:#}", e),
        }
    }

    async fn capture(&self, surface: &RenderSurface) -> Result<PathBuf> {
        let bytes = self.snapshot.capture(surface).await?;
        if bytes.is_empty() {
            bail!("Empty result");
        }
        let file_name = format!(
            "glowsnap-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            self.snapshot.extension()
        );
        self.sink.write(&file_name, &bytes)
    }

    /// A handler that runs this exporter, for binding into a [`HandlerSlot`]
    pub fn handler(&self) -> ExportHandler {
        let exporter = self.clone();
        Arc::new(move || -> BoxFuture<'static, ()> {
            let exporter = exporter.clone();
            Box::pin(async move { exporter.run().await })
        })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Snapshot double that remembers every surface it was asked to capture
    #[derive(Default)]
    pub struct RecordingSnapshot {
        pub surfaces: Mutex<Vec<RenderSurface>>,
        pub empty: bool,
    }

    impl RecordingSnapshot {
        pub fn captured(&self) -> Vec<RenderSurface> {
            self.surfaces.lock().unwrap().clone()
        }
    }

    impl Snapshot for RecordingSnapshot {
        fn extension(&self) -> &str {
            "png"
        }

        fn capture<'a>(&'a self, surface: &'a RenderSurface) -> BoxFuture<'a, Result<Vec<u8>>> {
            Box::pin(async move {
                self.surfaces.lock().unwrap().push(surface.clone());
                Ok(if self.empty { Vec::new() } else { b"png".to_vec() })
            })
        }
    }

    /// Sink double that keeps artifacts in memory
    #[derive(Default)]
    pub struct MemorySink {
        pub written: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ArtifactSink for MemorySink {
        fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
            self.written
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(file_name))
        }
    }
}
