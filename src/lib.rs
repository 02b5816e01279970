//! pagetap - Text region extraction and tap-to-select for page photos
//!
//! Recognizes text regions on a photographed page, maps them onto the page as
//! displayed in a viewport of any aspect ratio, and tracks which regions the
//! reader has selected.

pub mod config;
pub mod geometry;
pub mod recognition;
pub mod region;
pub mod selection;
pub mod source;
pub mod workflow;

pub use geometry::{region_at, to_viewport_rect, AspectFit, GeometryError, Point, Rect, Size};
pub use recognition::{
    Candidate, Observation, RecognitionAdapter, RecognitionError, RecognitionLevel,
    RecognitionOptions, RecognitionRequest, TextRecognizer,
};
pub use region::{NormalizedRect, RegionId, TextRegion};
pub use selection::{Selection, SelectionError};
pub use source::SourceImage;
pub use workflow::{
    LoadOutcome, LoadTask, OverlayRegion, SessionPhase, WorkflowController, WorkflowError,
};
