//! Member lifecycle and component indirection.
//!
//! A [`Space`] owns three things: the member registry (a sparse set keyed
//! by [`MemberId`]), one lazily created [`Table`] per component type ever
//! added, and the address bin — a flat array of `(type, table index)`
//! pairs. Each member's addresses occupy a contiguous run of the bin,
//! located by the member's `(address_index, component_count)`.
//!
//! Two pieces of bookkeeping keep the indirection consistent under
//! structural churn:
//!
//! - A table swap-remove relocates another member's value; the table slot
//!   carries the index of its bin entry, so the Space repairs exactly that
//!   entry with the slot's new index.
//! - When a member's run cannot grow in place, the whole run is relocated
//!   to the bin's tail (amortized by the geometric growth of `Vec`), and
//!   every moved address's table slot is repointed at its new bin row.
//!
//! Invalid member ids and contract violations (double-add, removing an
//! absent component through the non-`try` surface) are programming errors
//! and panic; the `try_*` variants exist for code that must probe first.

use std::collections::HashMap;
use std::sync::Arc;

use engine_component::table::Displaced;
use engine_component::{Component, MemberId, Table, TypeId, TypeRegistry};
use engine_sparse::SparseSet;

use crate::relationship::Relationship;

/// Where one component of one member physically lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentAddress {
    /// The component's type, naming the table.
    pub type_id: TypeId,
    /// The slot inside that type's table. Not stable: swap-removal can
    /// change it, in which case the bin entry is repaired in place.
    pub table_index: usize,
}

/// A member's view into the address bin: the start of its run and the
/// number of addresses in it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Member {
    pub(crate) address_index: usize,
    pub(crate) component_count: usize,
}

impl Member {
    /// One past the run's last row.
    pub(crate) fn end_address(&self) -> usize {
        self.address_index + self.component_count
    }

    /// The run's last row. Meaningless for an empty run.
    pub(crate) fn last_address(&self) -> usize {
        self.address_index + self.component_count - 1
    }
}

/// A container of members and their component storage, independent of any
/// other Space.
pub struct Space {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) tables: HashMap<TypeId, Table>,
    pub(crate) members: SparseSet<MemberId, Member>,
    pub(crate) address_bin: Vec<Option<ComponentAddress>>,
}

impl Space {
    /// Create an empty Space over a shared type registry.
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            tables: HashMap::new(),
            members: SparseSet::new(),
            address_bin: Vec::new(),
        }
    }

    /// The registry this Space resolves component types against.
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    // -- Member lifecycle --

    /// Create a member with no components. Freed ids are reused before
    /// fresh ones; a brand-new Space hands out id 0 first.
    pub fn create_member(&mut self) -> MemberId {
        // New runs always start at the bin's tail; the run claims rows
        // lazily as components are added.
        let member = Member {
            address_index: self.address_bin.len(),
            component_count: 0,
        };
        self.members.add(member)
    }

    /// Create a member and attach it to `parent_id`.
    pub fn create_child_member(&mut self, parent_id: MemberId) -> MemberId {
        let child_id = self.create_member();
        self.make_parent(parent_id, child_id);
        child_id
    }

    /// Create a member at a caller-chosen id. Used by deserialization to
    /// preserve persisted ids; skipped ids become allocatable.
    pub(crate) fn create_member_at(&mut self, member_id: MemberId) {
        let member = Member {
            address_index: self.address_bin.len(),
            component_count: 0,
        };
        self.members.request(member_id, member);
    }

    /// Delete a member and, depth-first, every member below it. All of the
    /// subtree's components are removed from their tables and every id is
    /// recycled.
    ///
    /// # Panics
    ///
    /// Panics if the id is not a live member.
    #[track_caller]
    pub fn delete_member(&mut self, member_id: MemberId) {
        self.verify_member(member_id);
        // Detach from the surviving parent, if any, then take the whole
        // subtree down.
        self.try_remove_parent(member_id);
        self.delete_subtree(member_id);
    }

    /// Delete a member if it exists. Returns `true` if a deletion
    /// happened.
    pub fn try_delete_member(&mut self, member_id: MemberId) -> bool {
        if !self.valid_member(member_id) {
            return false;
        }
        self.delete_member(member_id);
        true
    }

    /// Deep-copy a member: every component value is duplicated, children
    /// are duplicated recursively, and the copy is attached to the source's
    /// parent. Returns the copy's id.
    #[track_caller]
    pub fn duplicate_member(&mut self, source_id: MemberId) -> MemberId {
        self.verify_member(source_id);
        let duplicate_id = self.duplicate_subtree(source_id);
        if let Some(parent_id) = self.parent_of(source_id) {
            self.make_parent(parent_id, duplicate_id);
        }
        duplicate_id
    }

    /// Returns `true` if the id names a live member.
    #[must_use]
    pub fn valid_member(&self, member_id: MemberId) -> bool {
        self.members.contains(member_id)
    }

    /// Number of live members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Ids of all live members, in storage order.
    #[must_use]
    pub fn member_ids(&self) -> &[MemberId] {
        self.members.ids()
    }

    /// Remove every member, component, and table.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.members.clear();
        self.address_bin.clear();
    }

    // -- Hierarchy --

    /// Attach `child_id` under `parent_id`, detaching it from any current
    /// parent first. Both members get a [`Relationship`] on demand.
    #[track_caller]
    pub fn make_parent(&mut self, parent_id: MemberId, child_id: MemberId) {
        self.verify_member(parent_id);
        self.verify_member(child_id);
        assert!(
            parent_id != child_id,
            "{parent_id} cannot become its own parent"
        );
        self.try_remove_parent(child_id);
        self.ensure::<Relationship>(parent_id).children.push(child_id);
        self.ensure::<Relationship>(child_id).parent = parent_id;
    }

    /// Detach a member from its parent.
    ///
    /// # Panics
    ///
    /// Panics if the member has no parent.
    #[track_caller]
    pub fn remove_parent(&mut self, child_id: MemberId) {
        assert!(
            self.try_remove_parent(child_id),
            "{child_id} has no parent"
        );
    }

    /// Detach a member from its parent if it has one. Returns `true` if a
    /// link was removed.
    #[track_caller]
    pub fn try_remove_parent(&mut self, child_id: MemberId) -> bool {
        self.verify_member(child_id);
        let parent_id = match self.try_get::<Relationship>(child_id) {
            Some(relationship) if relationship.has_parent() => relationship.parent,
            _ => return false,
        };
        self.get_mut::<Relationship>(parent_id).nullify_child(child_id);
        self.get_mut::<Relationship>(child_id).nullify_parent();
        true
    }

    /// The member's parent, if it has one.
    #[track_caller]
    #[must_use]
    pub fn parent_of(&self, member_id: MemberId) -> Option<MemberId> {
        self.verify_member(member_id);
        self.try_get::<Relationship>(member_id)
            .and_then(|relationship| relationship.has_parent().then_some(relationship.parent))
    }

    /// The member's children, in attachment order.
    #[track_caller]
    #[must_use]
    pub fn children_of(&self, member_id: MemberId) -> &[MemberId] {
        self.verify_member(member_id);
        match self.try_get::<Relationship>(member_id) {
            Some(relationship) => &relationship.children,
            None => &[],
        }
    }

    /// Ids of all members without a parent, in storage order.
    #[must_use]
    pub fn root_member_ids(&self) -> Vec<MemberId> {
        self.members
            .ids()
            .iter()
            .copied()
            .filter(|&id| self.parent_of(id).is_none())
            .collect()
    }

    // -- Component creation, deletion, and access --

    /// Add a default-constructed `T` to a member and return it.
    ///
    /// Declared dependencies of `T` that the member lacks are added first.
    ///
    /// # Panics
    ///
    /// Panics if the member is invalid, already has `T`, or `T` is
    /// unregistered.
    #[track_caller]
    pub fn add<T: Component>(&mut self, member_id: MemberId) -> &mut T {
        let type_id = self.registry.require::<T>();
        let pointer = self.add_dyn(type_id, member_id);
        // SAFETY: the table for `type_id` stores `T`; `pointer` is the
        // freshly added slot.
        unsafe { &mut *pointer.cast::<T>() }
    }

    /// The member's `T`, added first if absent.
    #[track_caller]
    pub fn ensure<T: Component>(&mut self, member_id: MemberId) -> &mut T {
        let type_id = self.registry.require::<T>();
        if self.find_run_offset(type_id, member_id).is_none() {
            let pointer = self.add_dyn(type_id, member_id);
            // SAFETY: as in `add`.
            return unsafe { &mut *pointer.cast::<T>() };
        }
        self.get_mut::<T>(member_id)
    }

    /// Remove the member's `T`.
    ///
    /// # Panics
    ///
    /// Panics if the member is invalid or does not have `T`.
    #[track_caller]
    pub fn rem<T: Component>(&mut self, member_id: MemberId) {
        let type_id = self.registry.require::<T>();
        assert!(
            self.try_rem_dyn(type_id, member_id),
            "{member_id} does not have a {} component",
            T::type_name()
        );
    }

    /// Remove the member's `T` if present. Absence is a no-op that touches
    /// no table. Returns `true` if a component was removed.
    #[track_caller]
    pub fn try_rem<T: Component>(&mut self, member_id: MemberId) -> bool {
        match self.registry.get::<T>() {
            Some(type_id) => self.try_rem_dyn(type_id, member_id),
            None => false,
        }
    }

    /// The member's `T`.
    ///
    /// # Panics
    ///
    /// Panics if the member is invalid or does not have `T`.
    #[track_caller]
    #[must_use]
    pub fn get<T: Component>(&self, member_id: MemberId) -> &T {
        self.verify_member(member_id);
        match self.try_get::<T>(member_id) {
            Some(component) => component,
            None => panic!(
                "{member_id} does not have a {} component",
                T::type_name()
            ),
        }
    }

    /// Mutable variant of [`Space::get`].
    #[track_caller]
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, member_id: MemberId) -> &mut T {
        self.verify_member(member_id);
        match self.try_get_mut::<T>(member_id) {
            Some(component) => component,
            None => panic!(
                "{member_id} does not have a {} component",
                T::type_name()
            ),
        }
    }

    /// The member's `T`, or `None` if the member is invalid, `T` is
    /// unregistered, or the member lacks it.
    #[must_use]
    pub fn try_get<T: Component>(&self, member_id: MemberId) -> Option<&T> {
        let type_id = self.registry.get::<T>()?;
        let offset = self.find_run_offset(type_id, member_id)?;
        let member = self.members[member_id];
        let address = self.run_entry(member.address_index + offset);
        let table = self.tables.get(&type_id)?;
        // SAFETY: the table for `type_id` stores `T` values.
        Some(unsafe { table.get::<T>(address.table_index) })
    }

    /// Mutable variant of [`Space::try_get`].
    #[must_use]
    pub fn try_get_mut<T: Component>(&mut self, member_id: MemberId) -> Option<&mut T> {
        let type_id = self.registry.get::<T>()?;
        let offset = self.find_run_offset(type_id, member_id)?;
        let member = self.members[member_id];
        let address = self.run_entry(member.address_index + offset);
        let table = self.tables.get_mut(&type_id)?;
        // SAFETY: the table for `type_id` stores `T` values.
        Some(unsafe { table.get_mut::<T>(address.table_index) })
    }

    /// Returns `true` if the member is live and has a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, member_id: MemberId) -> bool {
        match self.registry.get::<T>() {
            Some(type_id) => self.has_component_dyn(type_id, member_id),
            None => false,
        }
    }

    /// Type-erased variant of [`Space::has_component`].
    #[must_use]
    pub fn has_component_dyn(&self, type_id: TypeId, member_id: MemberId) -> bool {
        self.find_run_offset(type_id, member_id).is_some()
    }

    // -- Bulk queries --

    /// Owners of every `T` in table (slot) order. Empty if no `T` was ever
    /// added.
    #[track_caller]
    #[must_use]
    pub fn slice<T: Component>(&self) -> Vec<MemberId> {
        self.slice_dyn(self.registry.require::<T>())
    }

    /// Type-erased variant of [`Space::slice`].
    #[must_use]
    pub fn slice_dyn(&self, type_id: TypeId) -> Vec<MemberId> {
        self.tables
            .get(&type_id)
            .map(|table| table.owners().to_vec())
            .unwrap_or_default()
    }

    /// Visit every `(owner, &T)` in table order.
    #[track_caller]
    pub fn visit<T: Component>(&self) -> impl Iterator<Item = (MemberId, &T)> {
        let type_id = self.registry.require::<T>();
        self.tables.get(&type_id).into_iter().flat_map(|table| {
            // SAFETY: the table for `type_id` stores `T` values.
            unsafe { table.iter::<T>() }
        })
    }

    /// Visit every `(owner, &mut T)` in table order.
    #[track_caller]
    pub fn visit_mut<T: Component>(&mut self) -> impl Iterator<Item = (MemberId, &mut T)> {
        let type_id = self.registry.require::<T>();
        self.tables.get_mut(&type_id).into_iter().flat_map(|table| {
            // SAFETY: the table for `type_id` stores `T` values.
            unsafe { table.iter_mut::<T>() }
        })
    }

    /// The table for a type, if any component of it was ever added here.
    #[must_use]
    pub fn table(&self, type_id: TypeId) -> Option<&Table> {
        self.tables.get(&type_id)
    }

    // -- Type-erased surface --

    /// Type-erased add. Returns a pointer to the freshly constructed
    /// value, valid until the next structural mutation of its table.
    #[track_caller]
    pub fn add_dyn(&mut self, type_id: TypeId, member_id: MemberId) -> *mut u8 {
        self.verify_member(member_id);
        assert!(
            !self.has_component_dyn(type_id, member_id),
            "{member_id} already has a {} component",
            self.registry.info(type_id).name()
        );
        if !self.tables.contains_key(&type_id) {
            let info = self.registry.info(type_id).clone();
            self.tables.insert(type_id, Table::new(info));
        }
        let dependencies = self.registry.info(type_id).dependencies().to_vec();
        for dependency in dependencies {
            if !self.has_component_dyn(dependency, member_id) {
                self.add_dyn(dependency, member_id);
            }
        }

        let row = self.claim_bin_row(member_id);
        let table = self.table_mut(type_id);
        let table_index = table.add(member_id, row);
        self.address_bin[row] = Some(ComponentAddress {
            type_id,
            table_index,
        });
        self.members[member_id].component_count += 1;
        self.table_mut(type_id).ptr_mut(table_index)
    }

    /// Type-erased removal.
    ///
    /// # Panics
    ///
    /// Panics if the member is invalid or does not have the component.
    #[track_caller]
    pub fn rem_dyn(&mut self, type_id: TypeId, member_id: MemberId) {
        assert!(
            self.try_rem_dyn(type_id, member_id),
            "{member_id} does not have a {} component",
            self.registry.info(type_id).name()
        );
    }

    /// Type-erased checked removal. Returns `true` if a component was
    /// removed.
    #[track_caller]
    pub fn try_rem_dyn(&mut self, type_id: TypeId, member_id: MemberId) -> bool {
        self.verify_member(member_id);
        let Some(offset) = self.find_run_offset(type_id, member_id) else {
            return false;
        };
        let member = self.members[member_id];
        let row = member.address_index + offset;
        let address = self.run_entry(row);

        if let Some(displaced) = self.table_mut(type_id).remove(address.table_index) {
            self.repair_displaced(displaced, address.table_index);
        }

        // Compact the run: its last entry fills the hole, and the moved
        // address's table slot is repointed at the new row.
        let last = member.last_address();
        if row != last {
            let moved = self.run_entry(last);
            self.address_bin[row] = Some(moved);
            self.table_mut(moved.type_id)
                .set_bin_row(moved.table_index, row);
        }
        self.address_bin[last] = None;
        self.members[member_id].component_count -= 1;
        true
    }

    // -- Internal bookkeeping --

    /// The address at a bin row that must be part of a live run.
    #[track_caller]
    pub(crate) fn run_entry(&self, row: usize) -> ComponentAddress {
        match self.address_bin[row] {
            Some(address) => address,
            None => panic!("address bin row {row} is vacant inside a member run"),
        }
    }

    #[track_caller]
    pub(crate) fn table_mut(&mut self, type_id: TypeId) -> &mut Table {
        match self.tables.get_mut(&type_id) {
            Some(table) => table,
            None => panic!("no table exists for {type_id}"),
        }
    }

    #[track_caller]
    pub(crate) fn verify_member(&self, member_id: MemberId) {
        assert!(
            self.members.contains(member_id),
            "{member_id} does not exist"
        );
    }

    /// Offset of the member's address for `type_id` within its run. `None`
    /// if the member is invalid or lacks the component.
    fn find_run_offset(&self, type_id: TypeId, member_id: MemberId) -> Option<usize> {
        let member = self.members.get(member_id)?;
        (0..member.component_count)
            .find(|&offset| self.run_entry(member.address_index + offset).type_id == type_id)
    }

    /// Claim the bin row a new address for this member will occupy,
    /// relocating the whole run to the bin's tail when its next row is
    /// taken by someone else. The caller fills the returned row.
    fn claim_bin_row(&mut self, member_id: MemberId) -> usize {
        let member = self.members[member_id];
        let next = member.end_address();
        if next == self.address_bin.len() {
            self.address_bin.push(None);
            return next;
        }
        if self.address_bin[next].is_none() {
            return next;
        }
        // The neighbouring run is in the way: move this member's whole run
        // to the tail and repoint each moved address's table slot.
        for offset in 0..member.component_count {
            let from = member.address_index + offset;
            let address = self.run_entry(from);
            self.address_bin[from] = None;
            let to = self.address_bin.len();
            self.address_bin.push(Some(address));
            self.table_mut(address.type_id)
                .set_bin_row(address.table_index, to);
        }
        let row = self.address_bin.len();
        self.address_bin.push(None);
        self.members[member_id].address_index = row - member.component_count;
        row
    }

    /// A table swap-remove moved another member's value to `new_index`;
    /// overwrite that member's bin entry to match.
    fn repair_displaced(&mut self, displaced: Displaced, new_index: usize) {
        match self.address_bin[displaced.bin_row].as_mut() {
            Some(entry) => entry.table_index = new_index,
            None => panic!(
                "address bin row {} is vacant but a table slot points at it",
                displaced.bin_row
            ),
        }
    }

    fn delete_subtree(&mut self, member_id: MemberId) {
        let children: Vec<MemberId> = self.children_of(member_id).to_vec();
        for child_id in children {
            self.delete_subtree(child_id);
        }
        let member = self.members[member_id];
        for row in member.address_index..member.end_address() {
            let address = self.run_entry(row);
            if let Some(displaced) = self.table_mut(address.type_id).remove(address.table_index) {
                self.repair_displaced(displaced, address.table_index);
            }
            self.address_bin[row] = None;
        }
        self.members.remove(member_id);
    }

    fn duplicate_subtree(&mut self, source_id: MemberId) -> MemberId {
        let duplicate_id = self.create_member();
        let relationship_type = self.registry.get::<Relationship>();
        let source = self.members[source_id];
        for offset in 0..source.component_count {
            let address = self.run_entry(source.address_index + offset);
            // Links are rebuilt below rather than copied: the source's
            // Relationship names the source's children, not the copies.
            if Some(address.type_id) == relationship_type {
                continue;
            }
            let row = self.claim_bin_row(duplicate_id);
            let table = self.table_mut(address.type_id);
            let table_index = table.duplicate(address.table_index, duplicate_id, row);
            self.address_bin[row] = Some(ComponentAddress {
                type_id: address.type_id,
                table_index,
            });
            self.members[duplicate_id].component_count += 1;
        }
        let children: Vec<MemberId> = self.children_of(source_id).to_vec();
        for child_id in children {
            let duplicate_child_id = self.duplicate_subtree(child_id);
            self.make_parent(duplicate_id, duplicate_child_id);
        }
        duplicate_id
    }
}

impl std::fmt::Debug for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Space")
            .field("members", &self.members.len())
            .field("tables", &self.tables.len())
            .field("address_bin", &self.address_bin.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct Transform {
        translation: [f32; 3],
    }

    impl Component for Transform {
        fn type_name() -> &'static str {
            "Transform"
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct Mesh {
        asset: String,
    }

    impl Component for Mesh {
        fn type_name() -> &'static str {
            "Mesh"
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct PointLight {
        intensity: f32,
    }

    impl Component for PointLight {
        fn type_name() -> &'static str {
            "PointLight"
        }
    }

    fn make_registry() -> Arc<TypeRegistry> {
        let mut builder = TypeRegistry::builder();
        builder.register::<Relationship>();
        builder.register::<Transform>();
        builder.register::<Mesh>();
        builder.register::<PointLight>();
        Arc::new(builder.build())
    }

    fn make_space() -> Space {
        Space::new(make_registry())
    }

    #[test]
    fn test_first_member_id_is_zero() {
        let mut space = make_space();
        assert_eq!(space.create_member(), MemberId(0));
        assert_eq!(space.create_member(), MemberId(1));
    }

    #[test]
    fn test_deleted_id_is_reissued() {
        let mut space = make_space();
        for _ in 0..5 {
            space.create_member();
        }
        space.delete_member(MemberId(2));
        assert_eq!(space.create_member(), MemberId(2));
    }

    #[test]
    fn test_add_rem_leaves_other_components_intact() {
        let mut space = make_space();
        let member = space.create_member();
        assert_eq!(member, MemberId(0));
        space.add::<Transform>(member).translation = [1.0, 2.0, 3.0];
        space.add::<Mesh>(member).asset = "cube.obj".to_string();
        space.rem::<Transform>(member);
        assert!(!space.has_component::<Transform>(member));
        assert_eq!(space.get::<Mesh>(member).asset, "cube.obj");
    }

    #[test]
    fn test_try_rem_absent_is_a_reported_noop() {
        let mut space = make_space();
        let a = space.create_member();
        let b = space.create_member();
        space.add::<Mesh>(b);
        assert!(!space.try_rem::<Mesh>(a));
        // No table mutation happened.
        assert_eq!(space.slice::<Mesh>(), vec![b]);
        assert!(space.try_rem::<Mesh>(b));
        assert!(space.slice::<Mesh>().is_empty());
    }

    #[test]
    #[should_panic(expected = "already has a Mesh component")]
    fn test_double_add_panics() {
        let mut space = make_space();
        let member = space.create_member();
        space.add::<Mesh>(member);
        space.add::<Mesh>(member);
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn test_invalid_member_panics() {
        let mut space = make_space();
        space.add::<Mesh>(MemberId(3));
    }

    #[test]
    fn test_ensure_returns_existing_component() {
        let mut space = make_space();
        let member = space.create_member();
        space.add::<PointLight>(member).intensity = 4.0;
        assert_eq!(space.ensure::<PointLight>(member).intensity, 4.0);
        let other = space.create_member();
        assert_eq!(space.ensure::<PointLight>(other).intensity, 0.0);
    }

    #[test]
    fn test_swap_removal_repairs_displaced_member() {
        let mut space = make_space();
        let a = space.create_member();
        let b = space.create_member();
        let c = space.create_member();
        space.add::<PointLight>(a).intensity = 1.0;
        space.add::<PointLight>(b).intensity = 2.0;
        space.add::<PointLight>(c).intensity = 3.0;
        // Removing a's light swap-moves c's value into slot 0; c's address
        // must follow it.
        space.rem::<PointLight>(a);
        assert_eq!(space.get::<PointLight>(b).intensity, 2.0);
        assert_eq!(space.get::<PointLight>(c).intensity, 3.0);
        assert_eq!(space.slice::<PointLight>(), vec![c, b]);
    }

    #[test]
    fn test_run_relocation_keeps_neighbours_consistent() {
        let mut space = make_space();
        let a = space.create_member();
        space.add::<Transform>(a).translation = [1.0; 3];
        // b's run starts right after a's single address.
        let b = space.create_member();
        space.add::<Transform>(b).translation = [2.0; 3];
        space.add::<Mesh>(b).asset = "b.obj".to_string();
        // Growing a's run now forces it to relocate to the bin tail.
        space.add::<Mesh>(a).asset = "a.obj".to_string();
        space.add::<PointLight>(a).intensity = 9.0;
        assert_eq!(space.get::<Transform>(a).translation, [1.0; 3]);
        assert_eq!(space.get::<Mesh>(a).asset, "a.obj");
        assert_eq!(space.get::<PointLight>(a).intensity, 9.0);
        assert_eq!(space.get::<Transform>(b).translation, [2.0; 3]);
        assert_eq!(space.get::<Mesh>(b).asset, "b.obj");
        // Structural churn after relocation still repairs correctly.
        space.rem::<Transform>(a);
        assert_eq!(space.get::<Transform>(b).translation, [2.0; 3]);
    }

    #[test]
    fn test_table_growth_preserves_values_and_order() {
        let mut space = make_space();
        let members: Vec<MemberId> = (0..engine_component::START_CAPACITY * 2 + 5)
            .map(|i| {
                let member = space.create_member();
                space.add::<PointLight>(member).intensity = i as f32;
                member
            })
            .collect();
        assert_eq!(space.slice::<PointLight>(), members);
        for (i, &member) in members.iter().enumerate() {
            assert_eq!(space.get::<PointLight>(member).intensity, i as f32);
        }
    }

    #[test]
    fn test_dependencies_are_ensured_on_add() {
        let mut builder = TypeRegistry::builder();
        builder.register::<Transform>();
        builder.register::<Mesh>();
        builder.depend::<Mesh, Transform>();
        let mut space = Space::new(Arc::new(builder.build()));

        let member = space.create_member();
        space.add::<Mesh>(member);
        assert!(space.has_component::<Transform>(member));
    }

    #[test]
    fn test_hierarchy_links_are_symmetric() {
        let mut space = make_space();
        let parent = space.create_member();
        let child_a = space.create_child_member(parent);
        let child_b = space.create_child_member(parent);
        assert_eq!(space.children_of(parent), &[child_a, child_b]);
        assert_eq!(space.parent_of(child_a), Some(parent));
        assert_eq!(space.parent_of(child_b), Some(parent));
        assert_eq!(space.root_member_ids(), vec![parent]);
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut space = make_space();
        let first = space.create_member();
        let second = space.create_member();
        let child = space.create_child_member(first);
        space.make_parent(second, child);
        assert!(space.children_of(first).is_empty());
        assert_eq!(space.children_of(second), &[child]);
        assert_eq!(space.parent_of(child), Some(second));
    }

    #[test]
    fn test_delete_member_removes_whole_subtree() {
        let mut space = make_space();
        let parent = space.create_member();
        let child_a = space.create_child_member(parent);
        let child_b = space.create_child_member(parent);
        let grandchild = space.create_child_member(child_a);
        space.add::<PointLight>(child_b).intensity = 2.0;
        space.add::<PointLight>(grandchild).intensity = 3.0;
        let survivor = space.create_member();
        space.add::<PointLight>(survivor).intensity = 7.0;

        space.delete_member(parent);

        for id in [parent, child_a, child_b, grandchild] {
            assert!(!space.valid_member(id));
        }
        assert_eq!(space.member_count(), 1);
        // No table owner or bin entry references a freed member.
        assert_eq!(space.slice::<PointLight>(), vec![survivor]);
        assert_eq!(space.get::<PointLight>(survivor).intensity, 7.0);
        for entry in space.address_bin.iter().flatten() {
            let table = space.table(entry.type_id).unwrap();
            assert!(space.valid_member(table.owner(entry.table_index)));
        }
    }

    #[test]
    fn test_delete_child_detaches_from_parent() {
        let mut space = make_space();
        let parent = space.create_member();
        let child = space.create_child_member(parent);
        space.delete_member(child);
        assert!(space.children_of(parent).is_empty());
        assert!(space.valid_member(parent));
    }

    #[test]
    fn test_try_delete_member_on_invalid_id() {
        let mut space = make_space();
        assert!(!space.try_delete_member(MemberId(5)));
        let member = space.create_member();
        assert!(space.try_delete_member(member));
        assert!(!space.try_delete_member(member));
    }

    #[test]
    fn test_duplicate_member_deep_copies_values_and_children() {
        let mut space = make_space();
        let source = space.create_member();
        space.add::<Transform>(source).translation = [5.0; 3];
        let child = space.create_child_member(source);
        space.add::<Mesh>(child).asset = "wheel.obj".to_string();

        let copy = space.duplicate_member(source);
        assert_ne!(copy, source);
        assert_eq!(space.get::<Transform>(copy).translation, [5.0; 3]);
        let copied_children = space.children_of(copy).to_vec();
        assert_eq!(copied_children.len(), 1);
        assert_ne!(copied_children[0], child);
        assert_eq!(space.get::<Mesh>(copied_children[0]).asset, "wheel.obj");

        // The copies are independent.
        space.get_mut::<Transform>(copy).translation = [9.0; 3];
        assert_eq!(space.get::<Transform>(source).translation, [5.0; 3]);
    }

    #[test]
    fn test_duplicate_attaches_to_source_parent() {
        let mut space = make_space();
        let parent = space.create_member();
        let child = space.create_child_member(parent);
        let copy = space.duplicate_member(child);
        assert_eq!(space.parent_of(copy), Some(parent));
        assert_eq!(space.children_of(parent), &[child, copy]);
    }

    #[test]
    fn test_visit_yields_owner_value_pairs() {
        let mut space = make_space();
        let a = space.create_member();
        let b = space.create_member();
        space.add::<PointLight>(a).intensity = 1.0;
        space.add::<PointLight>(b).intensity = 2.0;
        let visited: Vec<(MemberId, f32)> = space
            .visit::<PointLight>()
            .map(|(owner, light)| (owner, light.intensity))
            .collect();
        assert_eq!(visited, vec![(a, 1.0), (b, 2.0)]);

        for (_, light) in space.visit_mut::<PointLight>() {
            light.intensity *= 10.0;
        }
        assert_eq!(space.get::<PointLight>(a).intensity, 10.0);
        assert_eq!(space.get::<PointLight>(b).intensity, 20.0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut space = make_space();
        let member = space.create_member();
        space.add::<Mesh>(member);
        space.clear();
        assert_eq!(space.member_count(), 0);
        assert_eq!(space.create_member(), MemberId(0));
    }
}
