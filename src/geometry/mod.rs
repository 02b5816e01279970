//! Coordinate mapping between normalized image space and the viewport
//!
//! Recognized boxes live in normalized image space with a bottom-left origin.
//! The page photo is displayed scaled-to-fit and centered inside a viewport
//! whose origin is top-left. Everything here is pure and safe to call from
//! any number of render passes at once.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::region::NormalizedRect;

/// Invalid input to the coordinate mapper
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{what} size {width}x{height} has no usable area")]
    DegenerateInput {
        what: &'static str,
        width: f64,
        height: f64,
    },
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

/// A point in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle in viewport pixels (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Edges count as inside
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.max_x() && point.y >= self.y && point.y <= self.max_y()
    }
}

fn check_area(what: &'static str, size: Size) -> Result<(), GeometryError> {
    if size.has_area() {
        return Ok(());
    }
    warn!("Rejecting {} size {}x{}", what, size.width, size.height);
    Err(GeometryError::DegenerateInput {
        what,
        width: size.width,
        height: size.height,
    })
}

/// How an image is scaled and centered to fit a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectFit {
    image_size: Size,
    display_size: Size,
    offset: Point,
    scale: f64,
}

impl AspectFit {
    /// Fit `image_size` inside `viewport_size`, preserving aspect ratio.
    ///
    /// A wider image fills the viewport width and is centered vertically;
    /// otherwise it fills the height and is centered horizontally.
    pub fn compute(image_size: Size, viewport_size: Size) -> Result<Self, GeometryError> {
        check_area("image", image_size)?;
        check_area("viewport", viewport_size)?;

        let image_aspect = image_size.aspect();
        let viewport_aspect = viewport_size.aspect();

        let (display_size, offset) = if image_aspect > viewport_aspect {
            let display_height = viewport_size.width / image_aspect;
            (
                Size::new(viewport_size.width, display_height),
                Point::new(0.0, (viewport_size.height - display_height) / 2.0),
            )
        } else {
            let display_width = viewport_size.height * image_aspect;
            (
                Size::new(display_width, viewport_size.height),
                Point::new((viewport_size.width - display_width) / 2.0, 0.0),
            )
        };

        let scale = display_size.width / image_size.width;
        debug_assert!(
            (display_size.height / image_size.height - scale).abs() <= 1e-9 * scale.max(1.0),
            "horizontal and vertical fit scales diverged"
        );

        Ok(Self {
            image_size,
            display_size,
            offset,
            scale,
        })
    }

    /// Size of the image as displayed
    pub fn display_size(&self) -> Size {
        self.display_size
    }

    /// Top-left corner of the displayed image inside the viewport
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Image pixels to viewport pixels
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Where the whole image lands in the viewport
    pub fn display_rect(&self) -> Rect {
        Rect::new(
            self.offset.x,
            self.offset.y,
            self.display_size.width,
            self.display_size.height,
        )
    }

    /// Map a normalized, bottom-origin box to viewport pixels
    pub fn map(&self, normalized: NormalizedRect) -> Rect {
        let image = self.image_size;

        // Denormalize into image pixels, still bottom-origin
        let image_x = normalized.x * image.width;
        let image_y = normalized.y * image.height;
        let image_width = normalized.width * image.width;
        let image_height = normalized.height * image.height;

        let flipped_y = image.height - image_y - image_height;

        Rect::new(
            image_x * self.scale + self.offset.x,
            flipped_y * self.scale + self.offset.y,
            image_width * self.scale,
            image_height * self.scale,
        )
    }

    /// Index of the topmost box under `point`.
    ///
    /// Later boxes are drawn over earlier ones, so the last hit wins.
    pub fn hit_test<I>(&self, point: Point, boxes: I) -> Option<usize>
    where
        I: IntoIterator<Item = NormalizedRect>,
    {
        boxes
            .into_iter()
            .enumerate()
            .filter(|(_, bounds)| self.map(*bounds).contains(point))
            .map(|(index, _)| index)
            .last()
    }
}

/// Convert a normalized, bottom-origin box to viewport coordinates
pub fn to_viewport_rect(
    normalized: NormalizedRect,
    image_size: Size,
    viewport_size: Size,
) -> Result<Rect, GeometryError> {
    Ok(AspectFit::compute(image_size, viewport_size)?.map(normalized))
}

/// Find which box a tap at `point` (viewport pixels) landed on
pub fn region_at<I>(
    point: Point,
    boxes: I,
    image_size: Size,
    viewport_size: Size,
) -> Result<Option<usize>, GeometryError>
where
    I: IntoIterator<Item = NormalizedRect>,
{
    Ok(AspectFit::compute(image_size, viewport_size)?.hit_test(point, boxes))
}
