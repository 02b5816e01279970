//! Backends that replay known observations
//!
//! Used by tests and by the `pagetap` binary to drive the workflow without a
//! platform OCR engine.

use anyhow::{Context, Result};
use std::path::Path;

use super::{Observation, RecognitionError, RecognitionRequest, TextRecognizer};

/// Backend that never finds anything
#[derive(Debug, Default)]
pub struct NoopRecognizer;

impl TextRecognizer for NoopRecognizer {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn recognize(&self, _: &RecognitionRequest<'_>) -> Result<Vec<Observation>, RecognitionError> {
        Ok(Vec::new())
    }
}

/// Backend that returns the same observations for every image
#[derive(Debug, Clone)]
pub struct FixtureRecognizer {
    outcome: Result<Vec<Observation>, RecognitionError>,
}

impl FixtureRecognizer {
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self {
            outcome: Ok(observations),
        }
    }

    /// Backend that fails every call with `error`
    pub fn failing(error: RecognitionError) -> Self {
        Self { outcome: Err(error) }
    }

    /// Parse a JSON array of observations
    pub fn from_json(json: &str) -> Result<Self> {
        let observations: Vec<Observation> =
            serde_json::from_str(json).context("Failed to parse observations")?;
        Ok(Self::from_observations(observations))
    }

    /// Load a JSON array of observations from a file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read observations from {:?}", path))?;
        Self::from_json(&content)
    }

    pub fn observations(&self) -> &[Observation] {
        self.outcome.as_deref().unwrap_or(&[])
    }
}

impl TextRecognizer for FixtureRecognizer {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn recognize(&self, _: &RecognitionRequest<'_>) -> Result<Vec<Observation>, RecognitionError> {
        self.outcome.clone()
    }
}
