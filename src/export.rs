//! Export state machine and the exporter that drives it.
//!
//! One [`ExportJob`] exists per request. It starts at `Idle`, and every path out
//! of `Capturing` or `Assembling` ends in exactly one of `Succeeded` or
//! `Failed`. The [`Exporter`] refuses to start a second job while one is in
//! flight instead of queueing it.

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::document::MarkupDocument;
use crate::error::{Error, Result};
use crate::pdf::{self, PageGeometry};
use crate::rendering::Rasterizer;
use crate::sink::ArtifactSink;
use crate::theme::ThemeContext;
use crate::Renderable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Capturing,
    Assembling,
    Succeeded,
    Failed(String),
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Succeeded | ExportState::Failed(_))
    }

    fn name(&self) -> &'static str {
        match self {
            ExportState::Idle => "Idle",
            ExportState::Capturing => "Capturing",
            ExportState::Assembling => "Assembling",
            ExportState::Succeeded => "Succeeded",
            ExportState::Failed(_) => "Failed",
        }
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportState::Failed(reason) => write!(f, "Failed({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Requested,
    SnapshotReady,
    CaptureFailed(String),
    ContainerBuilt,
    AssemblyFailed(String),
}

impl ExportEvent {
    fn name(&self) -> &'static str {
        match self {
            ExportEvent::Requested => "Requested",
            ExportEvent::SnapshotReady => "SnapshotReady",
            ExportEvent::CaptureFailed(_) => "CaptureFailed",
            ExportEvent::ContainerBuilt => "ContainerBuilt",
            ExportEvent::AssemblyFailed(_) => "AssemblyFailed",
        }
    }
}

/// One export attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    state: ExportState,
    history: Vec<ExportState>,
}

impl Default for ExportJob {
    fn default() -> Self {
        Self {
            state: ExportState::Idle,
            history: vec![ExportState::Idle],
        }
    }
}

impl ExportJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    /// Every state visited, starting with `Idle`
    pub fn history(&self) -> &[ExportState] {
        &self.history
    }

    pub fn apply(&mut self, event: ExportEvent) -> Result<&ExportState> {
        let next = match (&self.state, event) {
            (ExportState::Idle, ExportEvent::Requested) => ExportState::Capturing,
            (ExportState::Capturing, ExportEvent::SnapshotReady) => ExportState::Assembling,
            (ExportState::Capturing, ExportEvent::CaptureFailed(reason)) => ExportState::Failed(reason),
            (ExportState::Assembling, ExportEvent::ContainerBuilt) => ExportState::Succeeded,
            (ExportState::Assembling, ExportEvent::AssemblyFailed(reason)) => ExportState::Failed(reason),
            (state, event) => {
                return Err(Error::InvalidTransition {
                    from: state.to_string(),
                    event: event.name().to_string(),
                })
            }
        };
        log::debug!("export job {} -> {}", self.state, next);
        self.history.push(next.clone());
        self.state = next;
        Ok(&self.state)
    }
}

/// What a successful export produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Where the sink put the artifact
    pub location: String,
    pub geometry: PageGeometry,
    /// Digest of the captured bitmap
    pub digest: String,
    pub size: usize,
    pub states: Vec<ExportState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing to export; capture was never attempted
    Ignored,
    Exported(ExportReport),
}

struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Runs exports, at most one at a time
#[derive(Debug, Default)]
pub struct Exporter {
    rasterizer: Rasterizer,
    in_flight: Cell<bool>,
    last: RefCell<Option<ExportState>>,
}

impl Exporter {
    pub fn new(rasterizer: Rasterizer) -> Self {
        Self {
            rasterizer,
            ..Self::default()
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// Terminal state of the most recent job, if any job has run
    pub fn last_state(&self) -> Option<ExportState> {
        self.last.borrow().clone()
    }

    /// Capture `surface`, assemble the PDF and hand it to `sink`.
    ///
    /// A blank document is ignored. The theme's background at the moment
    /// capture starts is what ends up in the bitmap.
    pub async fn export<R, S>(
        &self,
        document: &MarkupDocument,
        surface: &R,
        theme: &ThemeContext,
        sink: &S,
    ) -> Result<ExportOutcome>
    where
        R: Renderable + ?Sized,
        S: ArtifactSink + ?Sized,
    {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            log::warn!("export requested while another export is running");
            return Err(Error::AlreadyInProgress);
        };
        if document.is_blank() {
            log::debug!("export ignored: document is blank");
            return Ok(ExportOutcome::Ignored);
        }

        let mut job = ExportJob::new();
        let result = self.run(&mut job, surface, theme, sink).await;
        *self.last.borrow_mut() = Some(job.state().clone());

        match result {
            Ok(report) => {
                log::info!(
                    "exported {}x{} {:?} page to {}",
                    report.geometry.width,
                    report.geometry.height,
                    report.geometry.orientation,
                    report.location
                );
                Ok(ExportOutcome::Exported(report))
            }
            Err(err) => {
                log::error!("export failed: {}", err);
                if let Error::Capture(capture) = &err {
                    if capture.mentions_oklch() {
                        log::warn!(
                            "the preview uses oklch() colours, which cannot be captured; \
                             switch theme or replace the custom colour with hex or rgb()"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    async fn run<R, S>(&self, job: &mut ExportJob, surface: &R, theme: &ThemeContext, sink: &S) -> Result<ExportReport>
    where
        R: Renderable + ?Sized,
        S: ArtifactSink + ?Sized,
    {
        job.apply(ExportEvent::Requested)?;
        let background = theme.palette().background;
        let handle = surface.capture_region_handle();

        let snapshot = match self.rasterizer.capture(&handle, &background).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                job.apply(ExportEvent::CaptureFailed(err.to_string()))?;
                return Err(err.into());
            }
        };
        job.apply(ExportEvent::SnapshotReady)?;

        let saved = match pdf::assemble(&snapshot) {
            Ok(artifact) => sink.save(&artifact).await.map(|location| (artifact, location)),
            Err(err) => Err(err),
        };
        let (artifact, location) = match saved {
            Ok(saved) => saved,
            Err(err) => {
                job.apply(ExportEvent::AssemblyFailed(err.to_string()))?;
                return Err(err);
            }
        };
        job.apply(ExportEvent::ContainerBuilt)?;

        Ok(ExportReport {
            location,
            geometry: artifact.geometry,
            digest: snapshot.digest(),
            size: artifact.bytes.len(),
            states: job.history().to_vec(),
        })
    }
}
