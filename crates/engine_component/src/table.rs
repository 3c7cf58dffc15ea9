//! Dense per-type component storage.
//!
//! A [`Table`] is the sole physical owner of one component type's values
//! within a Space. Values live in a manually allocated block sized and
//! aligned from the type's registered [`Layout`](std::alloc::Layout), with
//! two parallel vectors: the owning [`MemberId`] per slot, and the index of
//! the slot's AddressBin entry (`bin_row`) so a swap-remove can name exactly
//! which entry the Space must repair.
//!
//! Slot indices are *not* stable: removal swap-moves the last slot into the
//! hole. Growth allocates a fresh block and frees the old one, so every raw
//! pointer into the table is invalidated by any `add` — callers must never
//! cache a component pointer across one.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::component::TypeId;
use crate::member::MemberId;
use crate::registry::TypeInfo;

/// Slot count of the first allocation.
pub const START_CAPACITY: usize = 10;

/// Multiplicative growth factor applied when the table is full.
pub const GROWTH_FACTOR: usize = 2;

/// The slot displaced by a swap-remove: its owner and the AddressBin entry
/// that now points at a stale index. The caller repairs that entry with the
/// index passed to [`Table::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Displaced {
    /// Owner of the relocated slot.
    pub owner: MemberId,
    /// AddressBin entry of the relocated slot.
    pub bin_row: usize,
}

/// Dense storage for all values of one component type.
pub struct Table {
    info: TypeInfo,
    data: NonNull<u8>,
    len: usize,
    capacity: usize,
    owners: Vec<MemberId>,
    bin_rows: Vec<usize>,
}

impl Table {
    /// Create an empty table for the given type. No memory is allocated
    /// until the first value is added.
    #[must_use]
    pub fn new(info: TypeInfo) -> Self {
        let data = dangling(info.layout().align());
        Self {
            info,
            data,
            len: 0,
            capacity: 0,
            owners: Vec::new(),
            bin_rows: Vec::new(),
        }
    }

    /// The type stored by this table.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.info.id()
    }

    /// The stored type's name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.info.name()
    }

    /// Byte size of one slot.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.info.size()
    }

    /// Number of live slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current slot capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owners of all live slots, in slot order.
    #[must_use]
    pub fn owners(&self) -> &[MemberId] {
        &self.owners
    }

    /// Owner of one slot.
    #[track_caller]
    #[must_use]
    pub fn owner(&self, index: usize) -> MemberId {
        self.verify_index(index);
        self.owners[index]
    }

    /// AddressBin entry of one slot.
    #[track_caller]
    #[must_use]
    pub fn bin_row(&self, index: usize) -> usize {
        self.verify_index(index);
        self.bin_rows[index]
    }

    /// Repoint a slot at a new AddressBin entry. Called by the Space when
    /// it relocates a member's address run.
    #[track_caller]
    pub fn set_bin_row(&mut self, index: usize, bin_row: usize) {
        self.verify_index(index);
        self.bin_rows[index] = bin_row;
    }

    /// Default-construct a value in the next free slot and record its
    /// owner. Returns the slot index.
    pub fn add(&mut self, owner: MemberId, bin_row: usize) -> usize {
        let index = self.allocate_slot(owner, bin_row);
        // SAFETY: the slot was just allocated and holds no live value.
        unsafe { self.info.default_in_place(self.slot_ptr(index)) };
        index
    }

    /// Copy-construct the value at `src` into a new slot owned by
    /// `new_owner`. Returns the new slot index.
    #[track_caller]
    pub fn duplicate(&mut self, src: usize, new_owner: MemberId, bin_row: usize) -> usize {
        self.verify_index(src);
        // Allocate first: growth would invalidate a pointer taken before it.
        let dst = self.allocate_slot(new_owner, bin_row);
        // SAFETY: `src` holds a live value, `dst` was just allocated.
        unsafe {
            self.info
                .clone_in_place(self.slot_ptr(src).cast_const(), self.slot_ptr(dst));
        }
        dst
    }

    /// Drop the value at `index`. Unless it was the last slot, the last
    /// slot's value, owner, and bin row are swap-moved into the hole and
    /// the displaced slot is reported so the caller can repair its
    /// AddressBin entry.
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> Option<Displaced> {
        self.verify_index(index);
        // SAFETY: `index` is a live slot.
        unsafe { self.info.drop_in_place(self.slot_ptr(index)) };
        let last = self.len - 1;
        let displaced = if index != last {
            // SAFETY: both slots are in bounds and distinct; the value at
            // `index` was dropped above, so this is a move, not an
            // overwrite of a live value.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.slot_ptr(last).cast_const(),
                    self.slot_ptr(index),
                    self.stride(),
                );
            }
            self.owners[index] = self.owners[last];
            self.bin_rows[index] = self.bin_rows[last];
            Some(Displaced {
                owner: self.owners[index],
                bin_row: self.bin_rows[index],
            })
        } else {
            None
        };
        self.owners.pop();
        self.bin_rows.pop();
        self.len = last;
        displaced
    }

    /// Raw pointer to the value at `index`.
    #[track_caller]
    #[must_use]
    pub fn ptr(&self, index: usize) -> *const u8 {
        self.verify_index(index);
        self.slot_ptr(index).cast_const()
    }

    /// Raw mutable pointer to the value at `index`.
    #[track_caller]
    #[must_use]
    pub fn ptr_mut(&mut self, index: usize) -> *mut u8 {
        self.verify_index(index);
        self.slot_ptr(index)
    }

    /// Typed reference to the value at `index`.
    ///
    /// # Safety
    ///
    /// `T` must be the type this table was created for.
    #[track_caller]
    #[must_use]
    pub unsafe fn get<T>(&self, index: usize) -> &T {
        self.verify_index(index);
        // SAFETY: the slot is live and the caller guarantees the type.
        unsafe { &*self.slot_ptr(index).cast::<T>() }
    }

    /// Typed mutable reference to the value at `index`.
    ///
    /// # Safety
    ///
    /// `T` must be the type this table was created for.
    #[track_caller]
    #[must_use]
    pub unsafe fn get_mut<T>(&mut self, index: usize) -> &mut T {
        self.verify_index(index);
        // SAFETY: the slot is live and the caller guarantees the type.
        unsafe { &mut *self.slot_ptr(index).cast::<T>() }
    }

    /// Visit every live slot as `(owner, &value)`, in slot order.
    ///
    /// # Safety
    ///
    /// `T` must be the type this table was created for.
    pub unsafe fn iter<'a, T: 'a>(&'a self) -> impl Iterator<Item = (MemberId, &'a T)> {
        let base = self.data.as_ptr().cast_const();
        let stride = self.stride();
        self.owners.iter().enumerate().map(move |(index, &owner)| {
            // SAFETY: every index below `len` is a live slot; the caller
            // guarantees the type.
            (owner, unsafe { &*base.add(index * stride).cast::<T>() })
        })
    }

    /// Visit every live slot as `(owner, &mut value)`, in slot order.
    ///
    /// # Safety
    ///
    /// `T` must be the type this table was created for.
    pub unsafe fn iter_mut<'a, T: 'a>(&'a mut self) -> impl Iterator<Item = (MemberId, &'a mut T)> {
        let base = self.data.as_ptr();
        let stride = self.stride();
        self.owners.iter().enumerate().map(move |(index, &owner)| {
            // SAFETY: every index below `len` is a live slot, each is
            // visited once; the caller guarantees the type.
            (owner, unsafe { &mut *base.add(index * stride).cast::<T>() })
        })
    }

    /// Serialize the value at `index` into a structured document value.
    #[track_caller]
    pub fn serialize_slot(&self, index: usize) -> Result<serde_json::Value, serde_json::Error> {
        self.verify_index(index);
        // SAFETY: the slot is live and the table's info matches its type.
        unsafe { self.info.serialize_value(self.slot_ptr(index).cast_const()) }
    }

    /// Replace the value at `index` with one parsed from a document value.
    /// On error the slot keeps its current value.
    #[track_caller]
    pub fn deserialize_slot(
        &mut self,
        index: usize,
        value: &serde_json::Value,
    ) -> Result<(), serde_json::Error> {
        self.verify_index(index);
        // SAFETY: the slot is live and the table's info matches its type.
        unsafe { self.info.deserialize_into(value, self.slot_ptr(index)) }
    }

    fn allocate_slot(&mut self, owner: MemberId, bin_row: usize) -> usize {
        if self.len == self.capacity {
            self.grow();
        }
        self.owners.push(owner);
        self.bin_rows.push(bin_row);
        let index = self.len;
        self.len += 1;
        index
    }

    /// Allocate a fresh block and relocate all live values into it. Rust
    /// values move by byte copy, so no per-element construct/destruct pass
    /// is needed; the old block is freed without dropping its contents.
    fn grow(&mut self) {
        let stride = self.stride();
        if stride == 0 {
            // Zero-sized types need no storage.
            self.capacity = usize::MAX;
            return;
        }
        let new_capacity = if self.capacity == 0 {
            START_CAPACITY
        } else {
            self.capacity * GROWTH_FACTOR
        };
        let new_layout = array_layout(self.info.layout(), new_capacity);
        // SAFETY: `new_layout` has non-zero size.
        let allocation = unsafe { std::alloc::alloc(new_layout) };
        let Some(new_data) = NonNull::new(allocation) else {
            std::alloc::handle_alloc_error(new_layout);
        };
        if self.capacity != 0 {
            // SAFETY: both blocks are live and distinct; `len * stride`
            // bytes are initialized in the old block.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.data.as_ptr().cast_const(),
                    new_data.as_ptr(),
                    self.len * stride,
                );
                std::alloc::dealloc(
                    self.data.as_ptr(),
                    array_layout(self.info.layout(), self.capacity),
                );
            }
        }
        self.data = new_data;
        self.capacity = new_capacity;
    }

    fn slot_ptr(&self, index: usize) -> *mut u8 {
        // Callers verify `index`; the pointer itself stays in bounds.
        self.data.as_ptr().wrapping_add(index * self.stride())
    }

    #[track_caller]
    fn verify_index(&self, index: usize) {
        assert!(
            index < self.len,
            "table index {index} is out of range (size {})",
            self.len
        );
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        for index in 0..self.len {
            // SAFETY: every index below `len` is a live slot.
            unsafe { self.info.drop_in_place(self.slot_ptr(index)) };
        }
        if self.capacity != 0 && self.stride() != 0 {
            // SAFETY: the block was allocated with this exact layout.
            unsafe {
                std::alloc::dealloc(
                    self.data.as_ptr(),
                    array_layout(self.info.layout(), self.capacity),
                );
            }
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("type", &self.info.name())
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

fn array_layout(element: Layout, capacity: usize) -> Layout {
    match Layout::from_size_align(element.size() * capacity, element.align()) {
        Ok(layout) => layout,
        Err(_) => panic!("component table capacity overflow"),
    }
}

fn dangling(align: usize) -> NonNull<u8> {
    // An aligned, never-dereferenced placeholder for the empty table.
    // SAFETY: alignment is never zero.
    unsafe { NonNull::new_unchecked(std::ptr::without_provenance_mut(align.max(1))) }
}
