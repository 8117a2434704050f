//! Pending entries waiting to be mined.

use std::collections::HashSet;

use valchain_types::Entry;

/// Insertion-ordered set of entries not yet on the adopted chain.
#[derive(Clone, Debug, Default)]
pub struct EntryPool {
    entries: Vec<Entry>,
    index: HashSet<Entry>,
}

impl EntryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless an equal entry is already pending.
    pub fn push(&mut self, entry: Entry) -> bool {
        if !self.index.insert(entry.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn remove(&mut self, entry: &Entry) -> bool {
        if !self.index.remove(entry) {
            return false;
        }
        self.entries.retain(|e| e != entry);
        true
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.index.contains(entry)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valchain_types::Digest;

    fn entry(key: &str, byte: u8) -> Entry {
        Entry::new(key, Digest::new([byte; 32]))
    }

    #[test]
    fn push_is_idempotent() {
        let mut pool = EntryPool::new();
        assert!(pool.push(entry("a", 1)));
        assert!(!pool.push(entry("a", 1)));
        assert!(pool.push(entry("a", 2)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn keeps_insertion_order() {
        let mut pool = EntryPool::new();
        pool.push(entry("b", 1));
        pool.push(entry("a", 1));
        pool.push(entry("c", 1));
        pool.remove(&entry("a", 1));
        let keys: Vec<&str> = pool.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut pool = EntryPool::new();
        pool.push(entry("a", 1));
        assert!(!pool.remove(&entry("a", 9)));
        assert!(pool.contains(&entry("a", 1)));
        assert!(!pool.is_empty());
    }
}
