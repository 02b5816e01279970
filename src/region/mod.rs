//! Recognized text regions
//!
//! A region is one span of text recovered from a page photo together with
//! where it sits in the image. Boxes are kept in normalized image space with
//! a bottom-left origin, the convention recognition backends report in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Opaque identifier of a region, unique for every recognized span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(Uuid);

impl RegionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Rectangle in normalized image space (0.0-1.0, bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    /// The whole image
    pub const UNIT: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True if the box has no usable area or carries non-finite values
    pub fn is_degenerate(&self) -> bool {
        let finite = self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite();
        !finite || self.width <= 0.0 || self.height <= 0.0
    }

    /// True if any part of the box lies inside the image.
    ///
    /// Backends sometimes report boxes that overshoot the image edge; those
    /// still overlap and are kept as reported.
    pub fn overlaps_image(&self) -> bool {
        self.x < 1.0 && self.y < 1.0 && self.x + self.width > 0.0 && self.y + self.height > 0.0
    }
}

/// One recognized span of text
///
/// Regions are immutable once built and compare by identity: two regions with
/// the same text and box from different recognition passes are different
/// regions.
#[derive(Debug, Clone, Serialize)]
pub struct TextRegion {
    id: RegionId,
    text: String,
    bounding_box: NormalizedRect,
}

impl TextRegion {
    /// Only the recognition adapter builds regions, after it has filtered
    /// empty text and degenerate boxes.
    pub(crate) fn new(text: String, bounding_box: NormalizedRect) -> Self {
        debug_assert!(!text.is_empty());
        debug_assert!(!bounding_box.is_degenerate());
        Self {
            id: RegionId::new(),
            text,
            bounding_box,
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Box in normalized, bottom-origin image space
    pub fn bounding_box(&self) -> NormalizedRect {
        self.bounding_box
    }
}

impl PartialEq for TextRegion {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TextRegion {}

impl Hash for TextRegion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
