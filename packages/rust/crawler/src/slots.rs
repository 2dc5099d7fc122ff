//! Index-correlated result storage for concurrent retrievals.

use modbind_shared::{ModbindError, PageId, Result};

/// One slot per requested page, positions fixed at construction.
///
/// Retrievals write by the index they were launched with, so completion
/// order never affects output order and repeated ids each keep their own slot.
#[derive(Debug, Clone)]
pub struct ContentSlots {
    slots: Vec<(PageId, Option<String>)>,
}

impl ContentSlots {
    pub fn new(page_ids: &[PageId]) -> Self {
        Self {
            slots: page_ids.iter().cloned().map(|id| (id, None)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Page id at `index`, if any.
    pub fn page_id(&self, index: usize) -> Option<&PageId> {
        self.slots.get(index).map(|(id, _)| id)
    }

    /// Store the document for the slot at `index`.
    ///
    /// Returns `false` if the index is out of range or the slot was already filled.
    pub fn fill(&mut self, index: usize, document: String) -> bool {
        match self.slots.get_mut(index) {
            Some((_, slot @ None)) => {
                *slot = Some(document);
                true
            }
            _ => false,
        }
    }

    /// Number of slots holding a document.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|(_, doc)| doc.is_some()).count()
    }

    /// Release the documents in request order. Every slot must be filled.
    pub fn into_documents(self) -> Result<Vec<String>> {
        self.slots
            .into_iter()
            .map(|(id, doc)| doc.ok_or_else(|| ModbindError::fetch(id.0, "no content received")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<PageId> {
        values.iter().map(|v| PageId::from(*v)).collect()
    }

    #[test]
    fn fills_by_index_in_any_order() {
        let mut slots = ContentSlots::new(&ids(&["a", "b", "c"]));
        assert!(slots.fill(2, "C".into()));
        assert!(slots.fill(0, "A".into()));
        assert_eq!(slots.filled(), 2);
        assert!(slots.fill(1, "B".into()));

        assert_eq!(slots.into_documents().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn duplicate_ids_keep_separate_slots() {
        let mut slots = ContentSlots::new(&ids(&["a", "a"]));
        assert!(slots.fill(1, "second".into()));
        assert!(slots.fill(0, "first".into()));

        assert_eq!(slots.into_documents().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn refuses_double_fill_and_out_of_range() {
        let mut slots = ContentSlots::new(&ids(&["a"]));
        assert!(slots.fill(0, "one".into()));
        assert!(!slots.fill(0, "two".into()));
        assert!(!slots.fill(5, "nope".into()));
        assert_eq!(slots.into_documents().unwrap(), vec!["one"]);
    }

    #[test]
    fn unfilled_slot_names_its_page() {
        let mut slots = ContentSlots::new(&ids(&["a", "b"]));
        slots.fill(0, "A".into());

        match slots.into_documents() {
            Err(ModbindError::Fetch { page_id, .. }) => assert_eq!(page_id, "b"),
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }
}
