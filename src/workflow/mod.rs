//! Selection session coordinator
//!
//! Owns the state of one tap-to-select session: the page image, its
//! recognized regions, the current selection and the viewport the page is
//! shown in. Image loads run recognition on tokio's blocking pool and are
//! tagged with a generation number; only the most recently started load may
//! commit its regions.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::geometry::{AspectFit, GeometryError, Point, Rect, Size};
use crate::recognition::{RecognitionAdapter, RecognitionError, TextRecognizer};
use crate::region::{RegionId, TextRegion};
use crate::selection::{Selection, SelectionError};
use crate::source::SourceImage;

/// Errors surfaced by the workflow controller
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Where a session is in its lifecycle
///
/// Whether recognition for the latest image is still running is reported
/// separately by [`WorkflowController::is_recognizing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No image loaded yet
    #[default]
    Idle,
    /// An image is loaded; its regions (possibly none) are open for selection
    Reviewing,
}

/// How a load ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Regions from this load are now the session's regions
    Committed { generation: u64, regions: usize },
    /// A newer load started first; this result was discarded
    Superseded { generation: u64 },
}

/// A region as a render layer needs it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayRegion {
    pub index: usize,
    pub id: RegionId,
    pub text: String,
    /// Viewport pixels, top-left origin
    pub rect: Rect,
    pub selected: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    /// Most recently started load
    generation: u64,
    phase: SessionPhase,
    /// The current generation has not committed yet
    recognizing: bool,
    source_image: Option<SourceImage>,
    selection: Selection,
    viewport_size: Option<Size>,
    /// Error from the last committed load (if any)
    last_error: Option<RecognitionError>,
}

impl SessionState {
    fn begin_load(&mut self, image: SourceImage) -> u64 {
        self.generation += 1;
        self.phase = SessionPhase::Reviewing;
        self.recognizing = true;
        self.source_image = Some(image);
        self.selection.replace_regions(Vec::new());
        self.last_error = None;
        self.generation
    }

    fn commit(
        &mut self,
        generation: u64,
        result: Result<Vec<TextRegion>, RecognitionError>,
    ) -> Result<LoadOutcome, WorkflowError> {
        if generation != self.generation {
            debug!(
                "Discarding result of load {} (current load is {})",
                generation, self.generation
            );
            return Ok(LoadOutcome::Superseded { generation });
        }

        self.recognizing = false;

        match result {
            Ok(regions) => {
                let count = regions.len();
                self.selection.replace_regions(regions);
                info!("Load {} committed {} regions", generation, count);
                Ok(LoadOutcome::Committed {
                    generation,
                    regions: count,
                })
            }
            Err(RecognitionError::NoTextFound) => {
                self.selection.replace_regions(Vec::new());
                info!("Load {} found no text", generation);
                Ok(LoadOutcome::Committed {
                    generation,
                    regions: 0,
                })
            }
            Err(e) => {
                self.selection.replace_regions(Vec::new());
                warn!("Load {} failed: {}", generation, e);
                self.last_error = Some(e.clone());
                Err(e.into())
            }
        }
    }

    fn fit(&self) -> Result<Option<AspectFit>, GeometryError> {
        match (&self.source_image, self.viewport_size) {
            (Some(image), Some(viewport)) => AspectFit::compute(image.size(), viewport).map(Some),
            _ => Ok(None),
        }
    }
}

/// Handle to an in-flight image load
///
/// The load commits on its own whether or not the task is awaited; `wait`
/// reports how it ended.
#[derive(Debug)]
pub struct LoadTask {
    generation: u64,
    handle: JoinHandle<Result<LoadOutcome, WorkflowError>>,
    state: Arc<Mutex<SessionState>>,
}

impl LoadTask {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for recognition and the commit step to finish.
    ///
    /// A load task that was cancelled or panicked before committing is
    /// committed here as a failed load.
    pub async fn wait(self) -> Result<LoadOutcome, WorkflowError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                let error = RecognitionError::processing(format!(
                    "load {} did not complete: {}",
                    self.generation, e
                ));
                self.state.lock().commit(self.generation, Err(error))
            }
        }
    }
}

/// Drives image -> regions -> selection -> confirmed text
pub struct WorkflowController<R> {
    adapter: Arc<RecognitionAdapter<R>>,
    state: Arc<Mutex<SessionState>>,
    runtime: Handle,
}

impl<R: TextRecognizer + 'static> WorkflowController<R> {
    /// Create a controller on the current tokio runtime
    pub fn new(adapter: RecognitionAdapter<R>) -> Result<Self, WorkflowError> {
        let runtime =
            Handle::try_current().map_err(|e| WorkflowError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(adapter, runtime))
    }

    /// Create a controller that runs loads on `runtime`
    pub fn with_handle(adapter: RecognitionAdapter<R>, runtime: Handle) -> Self {
        Self {
            adapter: Arc::new(adapter),
            state: Arc::new(Mutex::new(SessionState::default())),
            runtime,
        }
    }

    pub fn adapter(&self) -> &RecognitionAdapter<R> {
        &self.adapter
    }

    /// Start recognizing `image`.
    ///
    /// The selection and previous regions are dropped immediately. Any load
    /// still running becomes stale and its result will be discarded.
    pub fn load_image(&self, image: SourceImage) -> LoadTask {
        let generation = self.state.lock().begin_load(image.clone());
        info!(
            "Load {}: recognizing {}x{} image with {}",
            generation,
            image.width(),
            image.height(),
            self.adapter.recognizer().name()
        );

        let adapter = Arc::clone(&self.adapter);
        let state = Arc::clone(&self.state);
        let task_state = Arc::clone(&self.state);
        let handle = self.runtime.spawn(async move {
            let result = tokio::task::spawn_blocking(move || adapter.recognize(&image))
                .await
                .unwrap_or_else(|e| {
                    Err(RecognitionError::processing(format!(
                        "recognition task failed: {}",
                        e
                    )))
                });
            task_state.lock().commit(generation, result)
        });

        LoadTask {
            generation,
            handle,
            state,
        }
    }

    /// Generation of the most recently started load
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase
    }

    /// True while the latest load has not committed its regions
    pub fn is_recognizing(&self) -> bool {
        self.state.lock().recognizing
    }

    pub fn source_image(&self) -> Option<SourceImage> {
        self.state.lock().source_image.clone()
    }

    /// Error from the last committed load
    pub fn last_error(&self) -> Option<RecognitionError> {
        self.state.lock().last_error.clone()
    }

    /// Snapshot of the current regions
    pub fn regions(&self) -> Vec<TextRegion> {
        self.state.lock().selection.regions().to_vec()
    }

    pub fn select(&self, index: usize) -> Result<(), SelectionError> {
        self.state.lock().selection.select(index)
    }

    pub fn deselect(&self, index: usize) -> Result<(), SelectionError> {
        self.state.lock().selection.deselect(index)
    }

    pub fn toggle(&self, index: usize) -> Result<bool, SelectionError> {
        self.state.lock().selection.toggle(index)
    }

    pub fn select_all(&self) {
        self.state.lock().selection.select_all();
    }

    pub fn clear_all(&self) {
        self.state.lock().selection.clear_all();
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.state.lock().selection.is_selected(index)
    }

    pub fn count(&self) -> usize {
        self.state.lock().selection.count()
    }

    pub fn selected_text(&self) -> Vec<String> {
        self.state.lock().selection.selected_text()
    }

    pub fn preview_text(&self) -> String {
        self.state.lock().selection.preview_text()
    }

    pub fn can_confirm(&self) -> bool {
        self.state.lock().selection.can_confirm()
    }

    /// Hand off the selected text, in reading order
    pub fn confirm_selection(&self) -> Vec<String> {
        let text = self.state.lock().selection.selected_text();
        info!("Confirmed {} selected regions", text.len());
        text
    }

    /// Update the size of the surface the page is displayed in
    pub fn set_viewport_size(&self, size: Size) {
        debug!("Viewport resized to {}x{}", size.width, size.height);
        self.state.lock().viewport_size = Some(size);
    }

    pub fn viewport_size(&self) -> Option<Size> {
        self.state.lock().viewport_size
    }

    /// Where the page image is drawn inside the viewport
    pub fn display_rect(&self) -> Result<Option<Rect>, GeometryError> {
        Ok(self.state.lock().fit()?.map(|fit| fit.display_rect()))
    }

    /// Viewport placement of every region.
    ///
    /// Empty until both an image and a viewport size are known.
    pub fn overlays(&self) -> Result<Vec<OverlayRegion>, GeometryError> {
        let state = self.state.lock();
        let Some(fit) = state.fit()? else {
            return Ok(Vec::new());
        };

        Ok(state
            .selection
            .regions()
            .iter()
            .enumerate()
            .map(|(index, region)| OverlayRegion {
                index,
                id: region.id(),
                text: region.text().to_string(),
                rect: fit.map(region.bounding_box()),
                selected: state.selection.is_selected(index),
            })
            .collect())
    }

    /// Toggle the region under a tap at `point` (viewport pixels).
    ///
    /// Returns the toggled index, or `None` if the tap missed every region.
    pub fn tap(&self, point: Point) -> Result<Option<usize>, WorkflowError> {
        let mut state = self.state.lock();
        let Some(fit) = state.fit()? else {
            return Ok(None);
        };

        let boxes = state.selection.regions().iter().map(TextRegion::bounding_box);
        let Some(index) = fit.hit_test(point, boxes) else {
            debug!("Tap at ({}, {}) hit no region", point.x, point.y);
            return Ok(None);
        };

        let selected = state.selection.toggle(index)?;
        debug!("Tap toggled region {} (selected: {})", index, selected);
        Ok(Some(index))
    }
}
