//! # Intrusive Doubly-Linked List
//!
//! A list over records the caller owns. Each record embeds a [`Links`] pair and
//! is addressed by its index in the caller's storage, so the list itself is
//! three words (head, tail, length) and never allocates or owns node memory.
//!
//! ```text
//!  storage: [ r0 ][ r1 ][ r2 ][ r3 ][ r4 ]
//!                   │ ▲    ▲ │
//!   head ───────────┘ └────┘ └──────────────► r4 ◄─── tail
//! ```
//!
//! ## Contract
//! - All operations of one list must be given the same storage slice.
//! - A record is in at most one list. [`Links`] remembers membership, so
//!   linking an already linked record is refused instead of corrupting both
//!   lists.
//! - Reading or removing from an empty list reports [`ListError::Empty`].

use core::fmt;
use core::marker::PhantomData;

/// Failures of list operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ListError {
    /// The list holds no records.
    #[error("the list is empty")]
    Empty,
    /// The record is already a member of a list.
    #[error("record {0} is already linked into a list")]
    AlreadyLinked(usize),
    /// The index does not address a record of the storage slice.
    #[error("record {index} is outside the storage of {len} records")]
    OutOfBounds { index: usize, len: usize },
    /// The index does not fit the 32-bit link slots.
    #[error("record {0} cannot be addressed by a link")]
    IndexTooLarge(usize),
}

/// The two link slots a record embeds to become a list member.
///
/// Slots hold 32-bit indices with [`Links::NIL`] for "no neighbour", which
/// keeps a frame record small enough for a table covering all of RAM.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Links {
    next: u32,
    prev: u32,
    linked: bool,
}

impl Links {
    /// Slot value of a missing neighbour; also one past the largest index.
    pub const NIL: u32 = u32::MAX;

    /// Links of a record that belongs to no list.
    pub const UNLINKED: Self = Self {
        next: Self::NIL,
        prev: Self::NIL,
        linked: false,
    };

    #[must_use]
    pub const fn next(&self) -> Option<usize> {
        Self::decode(self.next)
    }

    #[must_use]
    pub const fn prev(&self) -> Option<usize> {
        Self::decode(self.prev)
    }

    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.linked
    }

    fn set_next(&mut self, next: Option<usize>) {
        self.next = Self::encode(next);
    }

    fn set_prev(&mut self, prev: Option<usize>) {
        self.prev = Self::encode(prev);
    }

    const fn decode(slot: u32) -> Option<usize> {
        if slot == Self::NIL {
            None
        } else {
            Some(slot as usize)
        }
    }

    /// Indices reaching a slot passed [`IntrusiveList::claim`], so they fit.
    fn encode(index: Option<usize>) -> u32 {
        index
            .and_then(|i| u32::try_from(i).ok())
            .unwrap_or(Self::NIL)
    }
}

impl Default for Links {
    fn default() -> Self {
        Self::UNLINKED
    }
}

impl fmt::Debug for Links {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.linked {
            write!(f, "Links({:?} <- * -> {:?})", self.prev(), self.next())
        } else {
            f.write_str("Links(unlinked)")
        }
    }
}

/// A record that can be a list member.
pub trait Linked {
    fn links(&self) -> &Links;
    fn links_mut(&mut self) -> &mut Links;
}

/// Doubly-linked list of records stored in a caller-owned slice.
pub struct IntrusiveList<T> {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    _nodes: PhantomData<fn(&T)>,
}

impl<T: Linked> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for IntrusiveList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrusiveList")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("len", &self.len)
            .finish()
    }
}

impl<T: Linked> IntrusiveList<T> {
    /// An empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            _nodes: PhantomData,
        }
    }

    /// Reset to the empty state.
    ///
    /// Records that were members keep their links; only use this on freshly
    /// reset storage.
    pub fn initialize(&mut self) {
        *self = Self::new();
    }

    /// Number of linked records.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn tail(&self) -> Option<usize> {
        self.tail
    }

    /// Index of the first record, without removing it.
    pub const fn peek_front(&self) -> Result<usize, ListError> {
        match self.head {
            Some(head) => Ok(head),
            None => Err(ListError::Empty),
        }
    }

    /// Link `index` in front of the current head. O(1).
    pub fn push_front(&mut self, nodes: &mut [T], index: usize) -> Result<(), ListError> {
        Self::claim(nodes, index)?;
        let old_head = self.head;

        let links = nodes[index].links_mut();
        links.set_prev(None);
        links.set_next(old_head);

        match old_head {
            Some(head) => Self::node_mut(nodes, head)?.links_mut().set_prev(Some(index)),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.len += 1;
        Ok(())
    }

    /// Link `index` behind the current tail. O(1).
    pub fn append_back(&mut self, nodes: &mut [T], index: usize) -> Result<(), ListError> {
        Self::claim(nodes, index)?;
        let old_tail = self.tail;

        let links = nodes[index].links_mut();
        links.set_prev(old_tail);
        links.set_next(None);

        match old_tail {
            Some(tail) => Self::node_mut(nodes, tail)?.links_mut().set_next(Some(index)),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        Ok(())
    }

    /// Unlink and return the first record. O(1).
    pub fn pop_front(&mut self, nodes: &mut [T]) -> Result<usize, ListError> {
        let head = self.peek_front()?;
        let node = Self::node_mut(nodes, head)?;
        let next = node.links().next();
        *node.links_mut() = Links::UNLINKED;

        match next {
            Some(next) => Self::node_mut(nodes, next)?.links_mut().set_prev(None),
            None => self.tail = None,
        }
        self.head = next;
        self.len -= 1;
        Ok(head)
    }

    /// The record following `index`, if any.
    #[must_use]
    pub fn next(nodes: &[T], index: usize) -> Option<usize> {
        nodes.get(index).and_then(|node| node.links().next())
    }

    /// Walk the list front to back.
    #[must_use]
    pub fn iter<'a>(&self, nodes: &'a [T]) -> Iter<'a, T> {
        Iter {
            nodes,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Mark `index` as linked, refusing records that already are.
    fn claim(nodes: &mut [T], index: usize) -> Result<(), ListError> {
        if index >= Links::NIL as usize {
            return Err(ListError::IndexTooLarge(index));
        }
        let links = Self::node_mut(nodes, index)?.links_mut();
        if links.linked {
            return Err(ListError::AlreadyLinked(index));
        }
        links.linked = true;
        Ok(())
    }

    fn node_mut(nodes: &mut [T], index: usize) -> Result<&mut T, ListError> {
        let len = nodes.len();
        nodes
            .get_mut(index)
            .ok_or(ListError::OutOfBounds { index, len })
    }
}

/// Front-to-back iterator over record indices, see [`IntrusiveList::iter`].
pub struct Iter<'a, T> {
    nodes: &'a [T],
    cursor: Option<usize>,
    remaining: usize,
}

impl<T: Linked> Iterator for Iter<'_, T> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        // `remaining` bounds the walk even if the storage was tampered with.
        if self.remaining == 0 {
            return None;
        }
        let index = self.cursor?;
        self.remaining -= 1;
        self.cursor = IntrusiveList::<T>::next(self.nodes, index);
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
