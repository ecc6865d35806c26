//! Visual highlight markers

use std::collections::{HashMap, HashSet};

use crate::content::BlockIndex;

/// Visual marker affordance of the rendering surface
pub trait MarkerSurface {
    /// Transient marker while a block is armed or committing
    fn mark_provisional(&mut self, block: BlockIndex);

    /// Remove the transient marker. Permanent markers are left alone.
    fn clear_marker(&mut self, block: BlockIndex);

    /// Replace the transient marker with the rendering of a stored highlight
    fn mark_permanent(&mut self, block: BlockIndex, highlight_id: &str);
}

/// What a block currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerState {
    Provisional,
    Permanent(Vec<String>),
}

/// Marker state per block, for surfaces without their own rendering
#[derive(Debug, Default)]
pub struct MarkerSet {
    provisional: HashSet<BlockIndex>,
    permanent: HashMap<BlockIndex, Vec<String>>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisional markers take precedence over stored highlights
    pub fn state(&self, block: BlockIndex) -> Option<MarkerState> {
        if self.provisional.contains(&block) {
            return Some(MarkerState::Provisional);
        }
        self.permanent
            .get(&block)
            .map(|ids| MarkerState::Permanent(ids.clone()))
    }

    pub fn provisional_count(&self) -> usize {
        self.provisional.len()
    }

    /// Highlight ids rendered on a block
    pub fn highlights(&self, block: BlockIndex) -> &[String] {
        self.permanent.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl MarkerSurface for MarkerSet {
    fn mark_provisional(&mut self, block: BlockIndex) {
        self.provisional.insert(block);
    }

    fn clear_marker(&mut self, block: BlockIndex) {
        self.provisional.remove(&block);
    }

    fn mark_permanent(&mut self, block: BlockIndex, highlight_id: &str) {
        self.provisional.remove(&block);
        let ids = self.permanent.entry(block).or_default();
        if !ids.iter().any(|id| id == highlight_id) {
            ids.push(highlight_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_lifecycle() {
        let mut markers = MarkerSet::new();
        let block = BlockIndex(3);

        assert_eq!(markers.state(block), None);

        markers.mark_provisional(block);
        assert_eq!(markers.state(block), Some(MarkerState::Provisional));

        markers.mark_permanent(block, "h1");
        markers.mark_permanent(block, "h1");
        assert_eq!(
            markers.state(block),
            Some(MarkerState::Permanent(vec!["h1".to_string()]))
        );
        assert_eq!(markers.provisional_count(), 0);
    }

    #[test]
    fn test_clear_keeps_permanent() {
        let mut markers = MarkerSet::new();
        let block = BlockIndex(0);

        markers.mark_permanent(block, "h1");
        markers.mark_provisional(block);
        markers.clear_marker(block);

        assert_eq!(markers.highlights(block), ["h1".to_string()]);
    }
}
