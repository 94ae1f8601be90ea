//! LRU List Module
//!
//! Arena-backed doubly linked list that keeps entries in recency order.
//!
//! Nodes live in a slot table and refer to each other by [`Handle`], so
//! moving a node to the front, unlinking it, or dropping the tail are all
//! O(1) without shared ownership between nodes.

use crate::cache::Entry;

/// Index of a node inside an [`LruList`].
pub type Handle = usize;

#[derive(Debug)]
struct Node {
    entry: Entry,
    prev: Option<Handle>,
    next: Option<Handle>,
}

// == LRU List ==
/// Recency ordered list of entries.
///
/// - Front (head) = Most recently used
/// - Back (tail) = Least recently used
#[derive(Debug, Default)]
pub struct LruList {
    /// Node storage; `None` marks a free slot
    slots: Vec<Option<Node>>,
    /// Free slots available for reuse
    free: Vec<Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
    len: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Inserts an entry at the MRU position and returns its handle.
    pub fn push_front(&mut self, entry: Entry) -> Handle {
        let node = Node {
            entry,
            prev: None,
            next: self.head,
        };

        let handle = match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(node);
                handle
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.head {
            Some(old_head) => self.node_mut(old_head).prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
        self.len += 1;
        handle
    }

    // == Move To Front ==
    /// Marks a node as most recently used.
    pub fn move_to_front(&mut self, handle: Handle) {
        if self.head == Some(handle) {
            return;
        }
        self.unlink(handle);

        let old_head = self.head;
        {
            let node = self.node_mut(handle);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
    }

    // == Remove ==
    /// Removes a node and returns its entry, or None for a stale handle.
    pub fn remove(&mut self, handle: Handle) -> Option<Entry> {
        if !self.is_live(handle) {
            return None;
        }
        self.unlink(handle);
        let node = self.slots[handle].take()?;
        self.free.push(handle);
        self.len -= 1;
        Some(node.entry)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<Entry> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Accessors ==
    /// Returns the handle at the LRU position.
    pub fn back(&self) -> Option<Handle> {
        self.tail
    }

    /// Returns the handle at the MRU position.
    pub fn front(&self) -> Option<Handle> {
        self.head
    }

    pub fn get(&self, handle: Handle) -> Option<&Entry> {
        self.slots.get(handle)?.as_ref().map(|node| &node.entry)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Entry> {
        self.slots
            .get_mut(handle)?
            .as_mut()
            .map(|node| &mut node.entry)
    }

    /// Returns the number of entries in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Iterate ==
    /// Walks the entries from MRU to LRU.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    // == Internal Helpers ==
    fn is_live(&self, handle: Handle) -> bool {
        matches!(self.slots.get(handle), Some(Some(_)))
    }

    /// Detaches a node from its neighbours, patching head and tail.
    /// The node's own links are left stale for the caller to overwrite.
    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = {
            let node = self.node(handle);
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    // Handles reaching these come from the list's own links or from callers
    // holding a handle they got from `push_front`, so the slot is occupied.
    fn node(&self, handle: Handle) -> &Node {
        match &self.slots[handle] {
            Some(node) => node,
            None => unreachable!("lru list handle {handle} points at a free slot"),
        }
    }

    fn node_mut(&mut self, handle: Handle) -> &mut Node {
        match &mut self.slots[handle] {
            Some(node) => node,
            None => unreachable!("lru list handle {handle} points at a free slot"),
        }
    }
}

// == Iterator ==
/// Iterator over entries in MRU to LRU order.
pub struct Iter<'a> {
    list: &'a LruList,
    cursor: Option<Handle>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let node = self.list.node(handle);
        self.cursor = node.next;
        Some(&node.entry)
    }
}
