//! Text recognition layer
//!
//! Runs an OCR backend over a page photo and turns its raw observations into
//! an ordered list of [`TextRegion`]s. The backend is injected through the
//! [`TextRecognizer`] trait so the adapter never owns process-wide state and
//! tests can substitute scripted backends.

pub mod fixture;

pub use fixture::{FixtureRecognizer, NoopRecognizer};

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use crate::region::{NormalizedRect, TextRegion};
use crate::source::SourceImage;

/// Errors raised while recognizing text in an image
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },
    #[error("no text found in image")]
    NoTextFound,
    #[error("text recognition failed: {message}")]
    ProcessingFailed { message: String },
}

impl RecognitionError {
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingFailed {
            message: message.into(),
        }
    }
}

/// Speed/accuracy trade-off requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionLevel {
    /// Slower, better on small print
    #[default]
    Accurate,
    /// Faster, for previews
    Fast,
}

/// Options passed through to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    pub level: RecognitionLevel,
    /// Let the backend correct words against its language model
    pub language_correction: bool,
    /// Preferred languages (e.g. "en-US"); empty lets the backend detect
    pub languages: Vec<String>,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            language_correction: true,
            languages: Vec::new(),
        }
    }
}

/// One candidate reading of an observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl Candidate {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A raw detection as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Normalized, bottom-origin bounds
    pub bounding_box: NormalizedRect,
    /// Candidate readings, best first
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl Observation {
    pub fn new(bounding_box: NormalizedRect, candidates: Vec<Candidate>) -> Self {
        Self {
            bounding_box,
            candidates,
        }
    }

    /// Observation with a single, fully confident reading
    pub fn single(bounding_box: NormalizedRect, text: impl Into<String>) -> Self {
        Self::new(bounding_box, vec![Candidate::new(text, 1.0)])
    }

    /// The single top-ranked candidate.
    ///
    /// `None` when there are no usable candidates, or when two candidates with
    /// different text share the highest confidence.
    pub fn top_candidate(&self) -> Option<&Candidate> {
        let mut best: Option<&Candidate> = None;
        let mut tied = false;

        for candidate in self.candidates.iter().filter(|c| c.confidence.is_finite()) {
            match best {
                None => best = Some(candidate),
                Some(current) if candidate.confidence > current.confidence => {
                    best = Some(candidate);
                    tied = false;
                }
                Some(current)
                    if candidate.confidence == current.confidence
                        && candidate.text != current.text =>
                {
                    tied = true;
                }
                Some(_) => {}
            }
        }

        if tied {
            None
        } else {
            best
        }
    }
}

/// OCR invocation
#[derive(Debug)]
pub struct RecognitionRequest<'a> {
    image: &'a SourceImage,
    options: &'a RecognitionOptions,
}

impl<'a> RecognitionRequest<'a> {
    pub fn new(image: &'a SourceImage, options: &'a RecognitionOptions) -> Self {
        Self { image, options }
    }

    pub fn image(&self) -> &'a SourceImage {
        self.image
    }

    pub fn options(&self) -> &'a RecognitionOptions {
        self.options
    }
}

/// An OCR backend
///
/// Implementations may block for the whole OCR pass; callers run them off the
/// interactive thread. Internal failures are reported as
/// [`RecognitionError::ProcessingFailed`].
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(
        &self,
        request: &RecognitionRequest<'_>,
    ) -> Result<Vec<Observation>, RecognitionError>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn recognize(
        &self,
        request: &RecognitionRequest<'_>,
    ) -> Result<Vec<Observation>, RecognitionError> {
        (**self).recognize(request)
    }
}

/// Converts backend observations into text regions
#[derive(Debug)]
pub struct RecognitionAdapter<R> {
    recognizer: R,
    options: RecognitionOptions,
}

impl<R: TextRecognizer> RecognitionAdapter<R> {
    /// Create an adapter with default options
    pub fn new(recognizer: R) -> Self {
        Self::with_options(recognizer, RecognitionOptions::default())
    }

    pub fn with_options(recognizer: R, options: RecognitionOptions) -> Self {
        Self {
            recognizer,
            options,
        }
    }

    pub fn options(&self) -> &RecognitionOptions {
        &self.options
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Recognize text regions in `image`, in backend output order.
    ///
    /// Observations without a clear top candidate, with empty text, or with a
    /// box that is degenerate or lies entirely off the image are dropped.
    /// Kept boxes are passed through exactly as the backend reported them.
    pub fn recognize(&self, image: &SourceImage) -> Result<Vec<TextRegion>, RecognitionError> {
        if image.is_empty() {
            return Err(RecognitionError::invalid_image(format!(
                "{}x{} image has no pixels",
                image.width(),
                image.height()
            )));
        }

        let start = Instant::now();
        let request = RecognitionRequest::new(image, &self.options);
        let observations = self.recognizer.recognize(&request)?;

        if observations.is_empty() {
            debug!("{} returned no observations", self.recognizer.name());
            return Err(RecognitionError::NoTextFound);
        }

        let total = observations.len();
        let regions: Vec<TextRegion> = observations
            .into_iter()
            .enumerate()
            .filter_map(|(index, observation)| to_region(index, observation))
            .collect();

        debug!(
            "{} recognition ({:?}) complete in {:?}: {} regions from {} observations",
            self.recognizer.name(),
            self.options.level,
            start.elapsed(),
            regions.len(),
            total
        );

        Ok(regions)
    }

    /// All recognized text, one region per line
    pub fn recognize_text(&self, image: &SourceImage) -> Result<String, RecognitionError> {
        let regions = self.recognize(image)?;
        Ok(regions
            .iter()
            .map(TextRegion::text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn to_region(index: usize, observation: Observation) -> Option<TextRegion> {
    let Some(candidate) = observation.top_candidate() else {
        debug!("Skipping observation {}: no top candidate", index);
        return None;
    };

    if candidate.text.is_empty() {
        debug!("Skipping observation {}: empty text", index);
        return None;
    }

    let bounds = observation.bounding_box;
    if bounds.is_degenerate() || !bounds.overlaps_image() {
        debug!("Skipping observation {}: unusable box {:?}", index, bounds);
        return None;
    }

    Some(TextRegion::new(candidate.text.clone(), bounds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn page() -> SourceImage {
        SourceImage::from_rgba(RgbaImage::new(64, 48))
    }

    fn line(y: f64, text: &str) -> Observation {
        Observation::single(NormalizedRect::new(0.1, y, 0.8, 0.05), text)
    }

    #[test]
    fn test_preserves_backend_order() {
        let adapter = RecognitionAdapter::new(FixtureRecognizer::from_observations(vec![
            line(0.9, "It was a bright cold day"),
            line(0.8, "in April, and the clocks"),
            line(0.7, "were striking thirteen."),
        ]));

        let regions = adapter.recognize(&page()).unwrap();
        let texts: Vec<&str> = regions.iter().map(TextRegion::text).collect();
        assert_eq!(
            texts,
            vec!["It was a bright cold day", "in April, and the clocks", "were striking thirteen."]
        );
    }

    #[test]
    fn test_boxes_pass_through_unchanged() {
        let inside = NormalizedRect::new(0.1, 0.2, 0.3, 0.1);
        let overshoot = NormalizedRect::new(0.9, 0.2, 0.5, 0.1);
        let adapter = RecognitionAdapter::new(FixtureRecognizer::from_observations(vec![
            Observation::single(inside, "Contents"),
            Observation::single(overshoot, "Chapter"),
        ]));

        let regions = adapter.recognize(&page()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].bounding_box(), inside);
        assert_eq!(regions[1].bounding_box(), overshoot);
    }

    #[test]
    fn test_zero_observations_is_no_text_found() {
        let adapter = RecognitionAdapter::new(NoopRecognizer);
        assert_eq!(adapter.recognize(&page()), Err(RecognitionError::NoTextFound));
    }

    #[test]
    fn test_empty_image_is_invalid() {
        let adapter = RecognitionAdapter::new(NoopRecognizer);
        let empty = SourceImage::from_rgba(RgbaImage::new(0, 0));
        assert!(matches!(
            adapter.recognize(&empty),
            Err(RecognitionError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_backend_failure_propagates() {
        let adapter = RecognitionAdapter::new(FixtureRecognizer::failing(
            RecognitionError::processing("model crashed"),
        ));
        assert_eq!(
            adapter.recognize(&page()),
            Err(RecognitionError::ProcessingFailed {
                message: "model crashed".to_string()
            })
        );
    }

    #[test]
    fn test_skips_unusable_observations() {
        let adapter = RecognitionAdapter::new(FixtureRecognizer::from_observations(vec![
            Observation::new(NormalizedRect::new(0.1, 0.9, 0.5, 0.05), vec![]),
            Observation::single(NormalizedRect::new(0.1, 0.8, 0.5, 0.05), ""),
            Observation::single(NormalizedRect::new(0.1, 0.7, 0.0, 0.05), "flat"),
            Observation::single(NormalizedRect::new(1.5, 0.6, 0.2, 0.05), "off page"),
            Observation::single(NormalizedRect::new(0.1, 0.5, 0.5, 0.05), "kept"),
        ]));

        let regions = adapter.recognize(&page()).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text(), "kept");
    }

    #[test]
    fn test_whitespace_text_is_kept() {
        let adapter = RecognitionAdapter::new(FixtureRecognizer::from_observations(vec![
            line(0.5, " "),
        ]));

        let regions = adapter.recognize(&page()).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text(), " ");
    }

    #[test]
    fn test_all_observations_skipped_is_empty_not_error() {
        let adapter = RecognitionAdapter::new(FixtureRecognizer::from_observations(vec![
            Observation::new(NormalizedRect::UNIT, vec![]),
        ]));
        assert_eq!(adapter.recognize(&page()).unwrap().len(), 0);
    }

    #[test]
    fn test_top_candidate_by_confidence() {
        let observation = Observation::new(
            NormalizedRect::UNIT,
            vec![
                Candidate::new("rnodern", 0.4),
                Candidate::new("modern", 0.9),
                Candidate::new("modem", 0.6),
            ],
        );
        assert_eq!(observation.top_candidate().unwrap().text, "modern");
    }

    #[test]
    fn test_tied_top_candidates_are_skipped() {
        let observation = Observation::new(
            NormalizedRect::UNIT,
            vec![Candidate::new("clay", 0.7), Candidate::new("day", 0.7)],
        );
        assert!(observation.top_candidate().is_none());

        // A higher candidate later breaks the tie
        let observation = Observation::new(
            NormalizedRect::UNIT,
            vec![
                Candidate::new("clay", 0.7),
                Candidate::new("day", 0.7),
                Candidate::new("dog", 0.8),
            ],
        );
        assert_eq!(observation.top_candidate().unwrap().text, "dog");

        // Duplicate readings are not ambiguous
        let observation = Observation::new(
            NormalizedRect::UNIT,
            vec![Candidate::new("day", 0.7), Candidate::new("day", 0.7)],
        );
        assert_eq!(observation.top_candidate().unwrap().text, "day");
    }

    #[test]
    fn test_non_finite_confidence_ignored() {
        let observation = Observation::new(
            NormalizedRect::UNIT,
            vec![Candidate::new("noise", f32::NAN), Candidate::new("word", 0.2)],
        );
        assert_eq!(observation.top_candidate().unwrap().text, "word");
    }

    #[test]
    fn test_recognize_text_joins_lines() {
        let adapter = RecognitionAdapter::new(FixtureRecognizer::from_observations(vec![
            line(0.9, "first"),
            line(0.8, "second"),
        ]));
        assert_eq!(adapter.recognize_text(&page()).unwrap(), "first\nsecond");
    }

    #[test]
    fn test_adapter_is_reusable() {
        let adapter =
            RecognitionAdapter::new(FixtureRecognizer::from_observations(vec![line(0.5, "again")]));

        let first = adapter.recognize(&page()).unwrap();
        let second = adapter.recognize(&page()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].id(), second[0].id());
    }

    #[test]
    fn test_options_reach_backend() {
        struct LevelCheck;

        impl TextRecognizer for LevelCheck {
            fn name(&self) -> &'static str {
                "level_check"
            }

            fn recognize(
                &self,
                request: &RecognitionRequest<'_>,
            ) -> Result<Vec<Observation>, RecognitionError> {
                let options = request.options();
                let text = format!(
                    "{:?} {} {}",
                    options.level,
                    options.language_correction,
                    options.languages.join(",")
                );
                Ok(vec![Observation::single(NormalizedRect::UNIT, text)])
            }
        }

        let options = RecognitionOptions {
            level: RecognitionLevel::Fast,
            language_correction: false,
            languages: vec!["de-DE".to_string()],
        };
        let adapter = RecognitionAdapter::with_options(LevelCheck, options);
        assert_eq!(adapter.recognize_text(&page()).unwrap(), "Fast false de-DE");
    }
}
