//! Selection state over a set of recognized regions

use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::region::TextRegion;

/// Selection referring to a region that does not exist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("region index {index} out of range (only {len} regions)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// The regions of one page and which of them are selected
///
/// Selected text is always produced in region order, not in the order the
/// user tapped.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    regions: Vec<TextRegion>,
    selected: BTreeSet<usize>,
}

impl Selection {
    pub fn new(regions: Vec<TextRegion>) -> Self {
        Self {
            regions,
            selected: BTreeSet::new(),
        }
    }

    /// Swap in a new region set; every previous selection is dropped
    pub fn replace_regions(&mut self, regions: Vec<TextRegion>) {
        debug!(
            "Replacing {} regions with {} (clearing {} selected)",
            self.regions.len(),
            regions.len(),
            self.selected.len()
        );
        self.regions = regions;
        self.selected.clear();
    }

    pub fn regions(&self) -> &[TextRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn check(&self, index: usize) -> Result<(), SelectionError> {
        if index < self.regions.len() {
            return Ok(());
        }
        warn!("Stale selection index {} (only {} regions)", index, self.regions.len());
        Err(SelectionError::IndexOutOfRange {
            index,
            len: self.regions.len(),
        })
    }

    pub fn select(&mut self, index: usize) -> Result<(), SelectionError> {
        self.check(index)?;
        self.selected.insert(index);
        Ok(())
    }

    pub fn deselect(&mut self, index: usize) -> Result<(), SelectionError> {
        self.check(index)?;
        self.selected.remove(&index);
        Ok(())
    }

    /// Flip the selection of `index`, returning whether it is now selected
    pub fn toggle(&mut self, index: usize) -> Result<bool, SelectionError> {
        self.check(index)?;
        if self.selected.remove(&index) {
            Ok(false)
        } else {
            self.selected.insert(index);
            Ok(true)
        }
    }

    pub fn select_all(&mut self) {
        self.selected = (0..self.regions.len()).collect();
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Number of selected regions
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    /// Selected indices, ascending
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    /// Text of the selected regions in reading order
    pub fn selected_text(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|&index| self.regions[index].text().to_string())
            .collect()
    }

    /// Selected text as one line, for a preview strip
    pub fn preview_text(&self) -> String {
        self.selected_text().join(" ")
    }

    /// Whether there is anything to hand downstream
    pub fn can_confirm(&self) -> bool {
        !self.selected.is_empty()
    }
}
