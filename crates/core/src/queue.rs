//! Ordered print queue with run-length wire encoding.
//!
//! A [`PrintQueue`] is the client's view of print order: a list of
//! [`QueueEntry`] rows, each a filename plus a copy count. The server only
//! knows the flat form (one filename per copy), produced by [`flatten`]
//! and read back by [`PrintQueue::replace_from_flat`].
//!
//! Rows are addressed by their client-side [`EntryId`], never by value,
//! because two rows may carry the same filename and count.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{EntryId, FlatQueue};

/// One logical line in the print queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    /// File to print. Empty for a placeholder row.
    pub file_name: String,
    /// Number of consecutive prints of this file. Always at least 1.
    pub copies: u32,
    /// Client-side identity, unique within the session.
    pub id: EntryId,
}

impl QueueEntry {
    /// A placeholder is waiting for the server to report a selected file.
    pub fn is_placeholder(&self) -> bool {
        self.file_name.is_empty()
    }
}

/// Expand entries into the flat wire form, preserving order.
pub fn flatten(entries: &[QueueEntry]) -> FlatQueue {
    let total: usize = entries.iter().map(|e| e.copies as usize).sum();
    let mut flat = Vec::with_capacity(total);
    for entry in entries {
        for _ in 0..entry.copies {
            flat.push(entry.file_name.clone());
        }
    }
    flat
}

/// Largest copy count a single entry may carry.
///
/// Bounds the flat queue built from local edits; each copy is one
/// filename on the wire.
pub const MAX_COPIES: u32 = 1_000;

/// Reject copy counts outside `1..=MAX_COPIES`.
pub fn validate_copies(copies: u32) -> Result<(), CoreError> {
    if copies == 0 {
        return Err(CoreError::Validation(
            "copies must be at least 1".to_string(),
        ));
    }
    if copies > MAX_COPIES {
        return Err(CoreError::Validation(format!(
            "copies must be at most {MAX_COPIES}, got {copies}"
        )));
    }
    Ok(())
}

/// Ordered queue entries plus the id counter.
#[derive(Debug, Clone, Default)]
pub struct PrintQueue {
    entries: Vec<QueueEntry>,
    next_id: EntryId,
}

impl PrintQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue by run-length decoding a flat list.
    pub fn from_flat(flat: &[String]) -> Self {
        let mut queue = Self::new();
        queue.replace_from_flat(flat);
        queue
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Flat wire form of the current entries.
    pub fn flatten(&self) -> FlatQueue {
        flatten(&self.entries)
    }

    /// Discard all entries, reset the id counter, and rebuild from `flat`.
    ///
    /// Only *adjacent* equal filenames merge into one entry: `[A, B, A]`
    /// yields three single-copy entries.
    pub fn replace_from_flat(&mut self, flat: &[String]) {
        self.entries.clear();
        self.next_id = 0;

        for (index, file_name) in flat.iter().enumerate() {
            let repeats_previous = index > 0 && flat[index - 1] == *file_name;
            if repeats_previous {
                if let Some(last) = self.entries.last_mut() {
                    last.copies = last.copies.saturating_add(1);
                    continue;
                }
            }

            let id = self.allocate_id();
            self.entries.push(QueueEntry {
                file_name: file_name.clone(),
                copies: 1,
                id,
            });
        }
    }

    /// Append an entry and return its id.
    pub fn push(&mut self, file_name: impl Into<String>, copies: u32) -> Result<EntryId, CoreError> {
        validate_copies(copies)?;
        let id = self.allocate_id();
        self.entries.push(QueueEntry {
            file_name: file_name.into(),
            copies,
            id,
        });
        Ok(id)
    }

    /// Append a single-copy placeholder row and return its id.
    pub fn push_placeholder(&mut self) -> EntryId {
        let id = self.allocate_id();
        self.entries.push(QueueEntry {
            file_name: String::new(),
            copies: 1,
            id,
        });
        id
    }

    /// Swap the entry with its predecessor. Returns `false` at the head or
    /// for an unknown id.
    pub fn move_up(&mut self, id: EntryId) -> bool {
        match self.position(id) {
            Some(index) if index > 0 => {
                self.entries.swap(index - 1, index);
                true
            }
            _ => false,
        }
    }

    /// Swap the entry with its successor. Returns `false` at the tail or
    /// for an unknown id.
    pub fn move_down(&mut self, id: EntryId) -> bool {
        match self.position(id) {
            Some(index) if index + 1 < self.entries.len() => {
                self.entries.swap(index, index + 1);
                true
            }
            _ => false,
        }
    }

    /// Remove the entry with the given id, if present.
    pub fn remove(&mut self, id: EntryId) -> Option<QueueEntry> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    /// Change the copy count of an entry. Returns whether the count changed.
    pub fn set_copies(&mut self, id: EntryId, copies: u32) -> Result<bool, CoreError> {
        validate_copies(copies)?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(CoreError::NotFound(id))?;
        if entry.copies == copies {
            return Ok(false);
        }
        entry.copies = copies;
        Ok(true)
    }

    /// Remove every entry. Returns whether anything was removed.
    ///
    /// The id counter keeps running so ids stay unique for the session.
    pub fn clear(&mut self) -> bool {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        had_entries
    }

    /// Give every placeholder row the file name, keeping its copies and id.
    ///
    /// All placeholders are filled, not only the first. Returns how many
    /// rows were filled.
    pub fn fill_placeholders(&mut self, file_name: &str) -> usize {
        let mut filled = 0;
        for entry in self.entries.iter_mut().filter(|e| e.is_placeholder()) {
            entry.file_name = file_name.to_string();
            filled += 1;
        }
        filled
    }

    // ---- private helpers ----

    fn allocate_id(&mut self) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn names(list: &[&str]) -> FlatQueue {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn shape(queue: &PrintQueue) -> Vec<(&str, u32)> {
        queue
            .entries()
            .iter()
            .map(|e| (e.file_name.as_str(), e.copies))
            .collect()
    }

    #[test]
    fn flatten_expands_copies_in_order() {
        let mut queue = PrintQueue::new();
        queue.push("a.gcode", 1).unwrap();
        queue.push("a.gcode", 1).unwrap();
        queue.push("b.gcode", 2).unwrap();

        assert_eq!(
            queue.flatten(),
            names(&["a.gcode", "a.gcode", "b.gcode", "b.gcode"])
        );
    }

    #[test]
    fn decode_merges_adjacent_duplicates() {
        let queue = PrintQueue::from_flat(&names(&["a", "a", "b", "b"]));
        assert_eq!(shape(&queue), vec![("a", 2), ("b", 2)]);
    }

    #[test]
    fn decode_keeps_non_adjacent_duplicates_apart() {
        let queue = PrintQueue::from_flat(&names(&["a", "b", "a"]));
        assert_eq!(shape(&queue), vec![("a", 1), ("b", 1), ("a", 1)]);
    }

    #[test]
    fn replace_resets_ids() {
        let mut queue = PrintQueue::new();
        queue.push("x", 1).unwrap();
        queue.push("y", 1).unwrap();

        queue.replace_from_flat(&names(&["a", "b"]));
        let ids: Vec<EntryId> = queue.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn push_rejects_zero_copies() {
        let mut queue = PrintQueue::new();
        assert_matches!(queue.push("a", 0), Err(CoreError::Validation(_)));
        assert!(queue.is_empty());
    }

    #[test]
    fn push_rejects_copies_above_cap() {
        let mut queue = PrintQueue::new();
        assert!(queue.push("a", MAX_COPIES).is_ok());
        let result = queue.push("b", MAX_COPIES + 1);
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("at most"));
        assert_matches!(queue.push("b", u32::MAX), Err(CoreError::Validation(_)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn set_copies_rejects_values_above_cap() {
        let mut queue = PrintQueue::new();
        let id = queue.push("a", 1).unwrap();
        assert_matches!(queue.set_copies(id, u32::MAX), Err(CoreError::Validation(_)));
        assert_eq!(queue.get(id).unwrap().copies, 1);
    }

    #[test]
    fn ids_are_unique_after_clear() {
        let mut queue = PrintQueue::new();
        let first = queue.push("a", 1).unwrap();
        queue.clear();
        let second = queue.push("a", 1).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn move_up_swaps_by_identity() {
        let mut queue = PrintQueue::new();
        queue.push("a", 1).unwrap();
        let twin = queue.push("a", 1).unwrap();
        queue.push("b", 1).unwrap();

        assert!(queue.move_up(twin));
        assert_eq!(queue.entries()[0].id, twin);
    }

    #[test]
    fn move_up_at_head_is_noop() {
        let mut queue = PrintQueue::new();
        let head = queue.push("a", 1).unwrap();
        queue.push("b", 1).unwrap();

        assert!(!queue.move_up(head));
        assert_eq!(shape(&queue), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn move_down_at_tail_is_noop() {
        let mut queue = PrintQueue::new();
        queue.push("a", 1).unwrap();
        let tail = queue.push("b", 1).unwrap();

        assert!(!queue.move_down(tail));
        assert_eq!(shape(&queue), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn move_down_swaps_with_successor() {
        let mut queue = PrintQueue::new();
        let head = queue.push("a", 1).unwrap();
        queue.push("b", 3).unwrap();

        assert!(queue.move_down(head));
        assert_eq!(shape(&queue), vec![("b", 3), ("a", 1)]);
    }

    #[test]
    fn moves_ignore_unknown_ids() {
        let mut queue = PrintQueue::new();
        queue.push("a", 1).unwrap();
        assert!(!queue.move_up(42));
        assert!(!queue.move_down(42));
    }

    #[test]
    fn remove_targets_only_the_given_id() {
        let mut queue = PrintQueue::new();
        let first = queue.push("a", 1).unwrap();
        let second = queue.push("a", 1).unwrap();

        let removed = queue.remove(second).unwrap();
        assert_eq!(removed.id, second);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.entries()[0].id, first);
        assert!(queue.remove(second).is_none());
    }

    #[test]
    fn set_copies_updates_count() {
        let mut queue = PrintQueue::new();
        let id = queue.push("a", 1).unwrap();

        assert!(queue.set_copies(id, 4).unwrap());
        assert!(!queue.set_copies(id, 4).unwrap());
        assert_eq!(queue.get(id).unwrap().copies, 4);
    }

    #[test]
    fn set_copies_rejects_zero_and_unknown() {
        let mut queue = PrintQueue::new();
        let id = queue.push("a", 2).unwrap();

        assert_matches!(queue.set_copies(id, 0), Err(CoreError::Validation(_)));
        assert_matches!(queue.set_copies(99, 1), Err(CoreError::NotFound(99)));
        assert_eq!(queue.get(id).unwrap().copies, 2);
    }

    #[test]
    fn fill_placeholders_fans_out() {
        let mut queue = PrintQueue::new();
        let first = queue.push_placeholder();
        let real = queue.push("foo.gcode", 1).unwrap();
        let second = queue.push_placeholder();
        queue.set_copies(second, 3).unwrap();

        assert_eq!(queue.fill_placeholders("bar.gcode"), 2);

        let first = queue.get(first).unwrap();
        assert_eq!(first.file_name, "bar.gcode");
        assert_eq!(first.copies, 1);
        let second = queue.get(second).unwrap();
        assert_eq!(second.file_name, "bar.gcode");
        assert_eq!(second.copies, 3);
        assert_eq!(queue.get(real).unwrap().file_name, "foo.gcode");
    }

    #[test]
    fn fill_placeholders_without_placeholder_changes_nothing() {
        let mut queue = PrintQueue::new();
        queue.push("foo.gcode", 1).unwrap();

        assert_eq!(queue.fill_placeholders("bar.gcode"), 0);
        assert_eq!(shape(&queue), vec![("foo.gcode", 1)]);
    }
}

#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use super::*;

    /// Flat queues over a small alphabet so adjacent repeats are common.
    /// The empty name stands in for a placeholder row.
    fn flat_queue() -> impl Strategy<Value = FlatQueue> {
        prop::collection::vec(
            prop::sample::select(vec!["a.gcode", "b.gcode", "c.gcode", ""]),
            0..40,
        )
        .prop_map(|names| names.into_iter().map(String::from).collect())
    }

    proptest! {
        #[test]
        fn decode_then_flatten_returns_input(flat in flat_queue()) {
            prop_assert_eq!(PrintQueue::from_flat(&flat).flatten(), flat);
        }

        #[test]
        fn decoded_rows_never_repeat_a_neighbour(flat in flat_queue()) {
            let queue = PrintQueue::from_flat(&flat);
            for pair in queue.entries().windows(2) {
                prop_assert_ne!(&pair[0].file_name, &pair[1].file_name);
            }
            let prints: u32 = queue.entries().iter().map(|e| e.copies).sum();
            prop_assert_eq!(prints as usize, flat.len());
        }

        #[test]
        fn decoded_ids_are_sequential(flat in flat_queue()) {
            let queue = PrintQueue::from_flat(&flat);
            for (index, entry) in queue.entries().iter().enumerate() {
                prop_assert_eq!(entry.id, index as EntryId);
                prop_assert!(entry.copies >= 1);
            }
        }
    }
}
