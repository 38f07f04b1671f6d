//! Watch mode for automatic rebuilds on file changes
//!
//! The debouncer thread classifies each batch of changed paths into a
//! [`RebuildRequest`] and pushes it onto a [`RebuildQueue`]. The queue holds
//! at most one pending request; anything pushed while one is pending is
//! merged into it. A single worker (the caller of [`watch`]) takes requests
//! one at a time, so rebuilds never overlap and a burst of changes collapses
//! into one rebuild.

use crate::build::assets::{FONTS_DIR, IMAGES_DIR};
use crate::build::{
    format_duration, BuildError, BuildPipeline, BuildPlan, BuildResult, Step, StepKind,
};
use crate::server::LiveReload;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Source directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// Which parts of the site a batch of changes invalidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildRequest {
    /// Something under `images/` changed
    pub images: bool,
    /// Something under `fonts/` changed
    pub fonts: bool,
    /// Anything else changed: styles, scripts and markup are recompiled
    pub compile: bool,
}

impl RebuildRequest {
    /// A request that recompiles everything except the copies.
    pub fn compile() -> Self {
        Self { compile: true, ..Self::default() }
    }

    /// Classify one changed path relative to the source root.
    ///
    /// Paths outside the source root produce an empty request.
    pub fn classify(src: &Path, path: &Path) -> Self {
        let Ok(rel) = path.strip_prefix(src) else {
            return Self::default();
        };
        match rel.components().next() {
            Some(Component::Normal(first)) if first == IMAGES_DIR => {
                Self { images: true, ..Self::default() }
            }
            Some(Component::Normal(first)) if first == FONTS_DIR => {
                Self { fonts: true, ..Self::default() }
            }
            _ => Self::compile(),
        }
    }

    /// Classify a batch of changed paths.
    pub fn from_paths<'a>(src: &Path, paths: impl IntoIterator<Item = &'a Path>) -> Self {
        paths.into_iter().fold(Self::default(), |acc, path| acc.merge(Self::classify(src, path)))
    }

    /// Union of two requests.
    pub fn merge(self, other: Self) -> Self {
        Self {
            images: self.images || other.images,
            fonts: self.fonts || other.fonts,
            compile: self.compile || other.compile,
        }
    }

    /// Whether nothing needs rebuilding.
    pub fn is_empty(&self) -> bool {
        !(self.images || self.fonts || self.compile)
    }

    /// The steps this request runs, in full-build order, without a clean.
    pub fn plan(&self) -> BuildPlan {
        let mut plan = BuildPlan::new();
        if self.images {
            plan.add_step(Step::independent(StepKind::CopyImages));
        }
        if self.fonts {
            plan.add_step(Step::independent(StepKind::CopyFonts));
        }
        if self.compile {
            plan.add_step(Step::new(StepKind::Styles));
            plan.add_step(Step::new(StepKind::Scripts));
            plan.add_step(Step::new(StepKind::Markup));
        }
        plan
    }

    /// Short human-readable list of what will run.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.images {
            parts.push("images");
        }
        if self.fonts {
            parts.push("fonts");
        }
        if self.compile {
            parts.push("styles, scripts, markup");
        }
        parts.join(", ")
    }
}

/// Depth-one queue of pending rebuilds.
#[derive(Debug, Default)]
pub struct RebuildQueue {
    pending: Mutex<Option<RebuildRequest>>,
    ready: Condvar,
}

impl RebuildQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<RebuildRequest>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a request, merging it into any request already pending.
    pub fn push(&self, request: RebuildRequest) {
        if request.is_empty() {
            return;
        }
        let mut pending = self.lock();
        *pending = Some(match pending.take() {
            Some(existing) => existing.merge(request),
            None => request,
        });
        self.ready.notify_one();
    }

    /// Block until a request is pending and take it.
    pub fn take(&self) -> RebuildRequest {
        let mut pending = self.lock();
        loop {
            if let Some(request) = pending.take() {
                return request;
            }
            pending = self.ready.wait(pending).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Run one rebuild and signal connected browsers.
///
/// The reload is sent even when a compile step failed, so the page shows
/// whatever output is current.
pub fn run_rebuild(
    pipeline: &BuildPipeline,
    reload: &LiveReload,
    request: RebuildRequest,
) -> Result<BuildResult, BuildError> {
    let result = pipeline.run(&request.plan())?;
    reload.reload();
    Ok(result)
}

/// Watch the source directory and rebuild on change.
///
/// Blocks forever once the watcher is running; only setup errors return.
pub fn watch(pipeline: &BuildPipeline, reload: &LiveReload) -> Result<(), WatchError> {
    let ctx = pipeline.context();
    let config = &ctx.config().watch;
    let src = ctx.src_dir();
    if !src.is_dir() {
        return Err(WatchError::SourceNotFound(src));
    }
    // Events may arrive with symlinks resolved.
    let canonical_src = src.canonicalize().unwrap_or_else(|_| src.clone());

    let queue = Arc::new(RebuildQueue::new());
    let producer = Arc::clone(&queue);
    let debounce = Duration::from_millis(u64::from(config.debounce_ms));

    let mut debouncer = new_debouncer(debounce, move |events: DebounceEventResult| match events {
        Ok(events) => {
            let changed: Vec<&Path> = events
                .iter()
                .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                .map(|e| e.path.as_path())
                .collect();
            for path in &changed {
                if let Some(name) = path.file_name() {
                    println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                }
            }
            let request = RebuildRequest::from_paths(&src, changed.iter().copied())
                .merge(RebuildRequest::from_paths(&canonical_src, changed.iter().copied()));
            debug!(?request, "queueing rebuild");
            producer.push(request);
        }
        Err(e) => warn!("watch error: {:?}", e),
    })
    .map_err(WatchError::WatcherInit)?;

    debouncer
        .watcher()
        .watch(&ctx.src_dir(), RecursiveMode::Recursive)
        .map_err(WatchError::WatchPath)?;

    let interactive = config.clear_screen && atty::is(atty::Stream::Stdout);
    println!("[{}] Watching {} for changes...", timestamp(), ctx.src_dir().display());

    loop {
        let request = queue.take();
        if interactive {
            clear_screen();
        }
        println!("[{}] Rebuilding {}...", timestamp(), request.describe());

        match run_rebuild(pipeline, reload, request) {
            Ok(result) if result.is_success() => println!(
                "[{}] Rebuild complete ({})",
                timestamp(),
                format_duration(result.total_duration)
            ),
            Ok(result) => println!(
                "[{}] Rebuild failed ({}) - {} of {} steps failed",
                timestamp(),
                format_duration(result.total_duration),
                result.failed_count(),
                result.steps.len()
            ),
            Err(e) => error!("rebuild aborted: {}", e),
        }
    }
}
