//! # engine_sparse
//!
//! A sparse-set container: maps externally-stable ids to positions in a
//! dense, contiguous, iterable value array with O(1) amortized insert,
//! remove, and lookup.
//!
//! Removal swap-moves the last dense element into the freed slot and fixes
//! both index maps, so the dense array never has holes. Ids handed out by
//! [`SparseSet::add`] are recycled through a free list after removal; a
//! caller that must match an external numbering can claim a specific id with
//! [`SparseSet::request`].
//!
//! Indexing an id that is not currently in use is a programming error and
//! panics.

/// An id type usable as the sparse key of a [`SparseSet`].
///
/// Implemented for the plain unsigned integers and for domain newtypes
/// (entity ids and the like) that wrap one.
pub trait SparseIndex: Copy + Eq + std::fmt::Debug {
    /// Build an id from a raw index.
    fn from_usize(index: usize) -> Self;

    /// The raw index this id wraps.
    fn to_usize(self) -> usize;
}

impl SparseIndex for u32 {
    fn from_usize(index: usize) -> Self {
        index as u32
    }

    fn to_usize(self) -> usize {
        self as usize
    }
}

impl SparseIndex for usize {
    fn from_usize(index: usize) -> Self {
        index
    }

    fn to_usize(self) -> usize {
        self
    }
}

/// A sparse set of values keyed by stable ids.
///
/// Three parallel structures: `sparse` maps an id to its dense position,
/// `dense_ids` maps a dense position back to its id, and `values` holds the
/// actual data at the same dense positions.
#[derive(Debug, Clone)]
pub struct SparseSet<I: SparseIndex, T> {
    /// Id -> dense position. `None` marks an id not currently in use.
    sparse: Vec<Option<usize>>,
    /// Dense position -> id. Parallel to `values`.
    dense_ids: Vec<I>,
    /// The dense value array.
    values: Vec<T>,
    /// Removed ids awaiting reuse, popped LIFO.
    free_ids: Vec<I>,
}

impl<I: SparseIndex, T> SparseSet<I, T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense_ids: Vec::new(),
            values: Vec::new(),
            free_ids: Vec::new(),
        }
    }

    /// Insert a value and return the id assigned to it.
    ///
    /// Recycled ids are reused (most recently removed first) before fresh
    /// ids are allocated.
    pub fn add(&mut self, value: T) -> I {
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = I::from_usize(self.sparse.len());
                self.sparse.push(None);
                id
            }
        };
        self.sparse[id.to_usize()] = Some(self.values.len());
        self.dense_ids.push(id);
        self.values.push(value);
        id
    }

    /// Insert a value at a caller-chosen id, filling any gap in the id
    /// space. Gap ids below the requested one become allocatable by
    /// [`SparseSet::add`].
    ///
    /// # Panics
    ///
    /// Panics if the id is already in use.
    #[track_caller]
    pub fn request(&mut self, id: I, value: T) -> &mut T {
        let index = id.to_usize();
        while self.sparse.len() <= index {
            let gap = I::from_usize(self.sparse.len());
            self.sparse.push(None);
            if gap != id {
                self.free_ids.push(gap);
            }
        }
        assert!(
            self.sparse[index].is_none(),
            "requested id {id:?} is already in use"
        );
        if let Some(free) = self.free_ids.iter().position(|&f| f == id) {
            self.free_ids.remove(free);
        }
        self.sparse[index] = Some(self.values.len());
        self.dense_ids.push(id);
        self.values.push(value);
        self.values.last_mut().unwrap()
    }

    /// Remove the value behind an id and return it.
    ///
    /// The last dense element is swap-moved into the freed slot; the id is
    /// recycled.
    ///
    /// # Panics
    ///
    /// Panics if the id is not in use.
    #[track_caller]
    pub fn remove(&mut self, id: I) -> T {
        let dense = self.dense_index(id);
        let last = self.values.len() - 1;
        self.dense_ids.swap(dense, last);
        self.values.swap(dense, last);
        // The swapped-in element (if any) now lives at `dense`.
        if dense != last {
            let moved = self.dense_ids[dense];
            self.sparse[moved.to_usize()] = Some(dense);
        }
        self.sparse[id.to_usize()] = None;
        self.dense_ids.pop();
        self.free_ids.push(id);
        self.values.pop().unwrap()
    }

    /// Returns `true` if the id is currently in use.
    #[must_use]
    pub fn contains(&self, id: I) -> bool {
        self.sparse
            .get(id.to_usize())
            .is_some_and(|entry| entry.is_some())
    }

    /// Returns a reference to the value behind an id, if it is in use.
    #[must_use]
    pub fn get(&self, id: I) -> Option<&T> {
        let dense = *self.sparse.get(id.to_usize())?;
        Some(&self.values[dense?])
    }

    /// Returns a mutable reference to the value behind an id, if it is in
    /// use.
    #[must_use]
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        let dense = (*self.sparse.get(id.to_usize())?)?;
        Some(&mut self.values[dense])
    }

    /// Number of values currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the set stores no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(id, &value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.dense_ids.iter().copied().zip(self.values.iter())
    }

    /// Iterate over `(id, &mut value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.dense_ids.iter().copied().zip(self.values.iter_mut())
    }

    /// The ids currently in use, in dense order.
    #[must_use]
    pub fn ids(&self) -> &[I] {
        &self.dense_ids
    }

    /// The dense value array.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Remove every value and forget all recycled ids.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense_ids.clear();
        self.values.clear();
        self.free_ids.clear();
    }

    /// Dense position of an id, panicking if the id is not in use.
    #[track_caller]
    fn dense_index(&self, id: I) -> usize {
        match self.sparse.get(id.to_usize()) {
            Some(&Some(dense)) => dense,
            _ => panic!("sparse id {id:?} is not in use"),
        }
    }
}

impl<I: SparseIndex, T> Default for SparseSet<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: SparseIndex, T> std::ops::Index<I> for SparseSet<I, T> {
    type Output = T;

    #[track_caller]
    fn index(&self, id: I) -> &T {
        &self.values[self.dense_index(id)]
    }
}

impl<I: SparseIndex, T> std::ops::IndexMut<I> for SparseSet<I, T> {
    #[track_caller]
    fn index_mut(&mut self, id: I) -> &mut T {
        let dense = self.dense_index(id);
        &mut self.values[dense]
    }
}
