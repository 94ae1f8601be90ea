//! Cache Entry Module
//!
//! Defines a single key/value pair held by a shard.

// == Entry ==
/// A key/value pair owned by a single [`LruStore`](super::LruStore).
///
/// The entry is charged `key.len() + value.len()` bytes against the
/// capacity of the store that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The key bytes
    pub key: Vec<u8>,
    /// The value bytes
    pub value: Vec<u8>,
}

impl Entry {
    // == Constructor ==
    /// Creates a new entry by copying the given key and value.
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    // == Charge ==
    /// Returns the number of bytes this entry occupies.
    pub fn charge(&self) -> usize {
        charge_of(&self.key, &self.value)
    }

    // == Replace Value ==
    /// Swaps in a new value, returning the previous one.
    pub fn replace_value(&mut self, value: &[u8]) -> Vec<u8> {
        std::mem::replace(&mut self.value, value.to_vec())
    }
}

// == Utility Functions ==
/// Byte charge of a key/value pair that may not be stored yet.
pub fn charge_of(key: &[u8], value: &[u8]) -> usize {
    key.len().saturating_add(value.len())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_charge() {
        let entry = Entry::new(b"bb", b"22");
        assert_eq!(entry.charge(), 4);
    }

    #[test]
    fn test_entry_empty_value() {
        let entry = Entry::new(b"key", b"");
        assert_eq!(entry.charge(), 3);
        assert!(entry.value.is_empty());
    }

    #[test]
    fn test_replace_value_changes_charge() {
        let mut entry = Entry::new(b"k", b"short");
        let old = entry.replace_value(b"much longer");

        assert_eq!(old, b"short".to_vec());
        assert_eq!(entry.value, b"much longer".to_vec());
        assert_eq!(entry.charge(), 1 + 11);
    }

    #[test]
    fn test_charge_of_matches_entry() {
        assert_eq!(charge_of(b"abc", b"12345"), Entry::new(b"abc", b"12345").charge());
    }
}
