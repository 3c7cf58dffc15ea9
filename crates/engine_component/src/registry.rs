//! Explicit component type registry.
//!
//! The registry is built once at startup from an ordered sequence of
//! registration calls — [`TypeId`]s map directly to call order, and nothing
//! depends on static-initialization order. Per type it records the byte
//! layout, declared inter-type dependencies, and the type-erased construct/
//! copy/drop/serialize functions that let a [`Table`](crate::Table) manage
//! values without knowing their Rust type.
//!
//! Registering the same type (or the same name) twice is a programming
//! error and panics.

use std::alloc::Layout;
use std::collections::HashMap;

use serde_json::Value;

use crate::component::{Component, TypeId};

type DefaultFn = unsafe fn(*mut u8);
type CloneFn = unsafe fn(*const u8, *mut u8);
type DropFn = unsafe fn(*mut u8);
type SerializeFn = unsafe fn(*const u8) -> Result<Value, serde_json::Error>;
type DeserializeFn = unsafe fn(&Value, *mut u8) -> Result<(), serde_json::Error>;

/// Per-type metadata: identity, layout, declared dependencies, and the
/// type-erased value operations.
#[derive(Clone)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    layout: Layout,
    dependencies: Vec<TypeId>,
    dependants: Vec<TypeId>,
    default_fn: DefaultFn,
    clone_fn: CloneFn,
    drop_fn: Option<DropFn>,
    serialize_fn: SerializeFn,
    deserialize_fn: DeserializeFn,
}

impl TypeInfo {
    fn of<T: Component>(id: TypeId) -> Self {
        Self {
            id,
            name: T::type_name(),
            layout: Layout::new::<T>(),
            dependencies: Vec::new(),
            dependants: Vec::new(),
            default_fn: default_raw::<T>,
            clone_fn: clone_raw::<T>,
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(drop_raw::<T>)
            } else {
                None
            },
            serialize_fn: serialize_raw::<T>,
            deserialize_fn: deserialize_raw::<T>,
        }
    }

    /// The registration-order id of this type.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The human-readable type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Byte size of one value. This is what the descriptor file records.
    #[must_use]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Size and alignment of one value.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Types this type declares a dependency on. Contract metadata; the
    /// Space ensures these are present before a value of this type is
    /// added.
    #[must_use]
    pub fn dependencies(&self) -> &[TypeId] {
        &self.dependencies
    }

    /// Types that declared a dependency on this type.
    #[must_use]
    pub fn dependants(&self) -> &[TypeId] {
        &self.dependants
    }

    /// Default-construct a value in place.
    ///
    /// # Safety
    ///
    /// `dst` must be writable, aligned for this type, and not hold a live
    /// value.
    pub(crate) unsafe fn default_in_place(&self, dst: *mut u8) {
        // SAFETY: forwarded to the caller.
        unsafe { (self.default_fn)(dst) }
    }

    /// Copy-construct the value at `src` into `dst`.
    ///
    /// # Safety
    ///
    /// `src` must hold a live value of this type; `dst` must be writable,
    /// aligned, and not hold a live value.
    pub(crate) unsafe fn clone_in_place(&self, src: *const u8, dst: *mut u8) {
        // SAFETY: forwarded to the caller.
        unsafe { (self.clone_fn)(src, dst) }
    }

    /// Drop the value at `ptr` in place.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a live value of this type; the value must not be
    /// used afterwards.
    pub(crate) unsafe fn drop_in_place(&self, ptr: *mut u8) {
        if let Some(drop_fn) = self.drop_fn {
            // SAFETY: forwarded to the caller.
            unsafe { drop_fn(ptr) }
        }
    }

    /// Serialize the value at `src` into a structured document value.
    ///
    /// # Safety
    ///
    /// `src` must hold a live value of this type.
    pub(crate) unsafe fn serialize_value(&self, src: *const u8) -> Result<Value, serde_json::Error> {
        // SAFETY: forwarded to the caller.
        unsafe { (self.serialize_fn)(src) }
    }

    /// Replace the live value at `dst` with one parsed from a document
    /// value. On error `dst` is left unchanged.
    ///
    /// # Safety
    ///
    /// `dst` must hold a live value of this type.
    pub(crate) unsafe fn deserialize_into(
        &self,
        value: &Value,
        dst: *mut u8,
    ) -> Result<(), serde_json::Error> {
        // SAFETY: forwarded to the caller.
        unsafe { (self.deserialize_fn)(value, dst) }
    }
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.layout.size())
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

unsafe fn default_raw<T: Component>(dst: *mut u8) {
    // SAFETY: the caller passes a writable slot aligned for `T`.
    unsafe { dst.cast::<T>().write(T::default()) }
}

unsafe fn clone_raw<T: Component>(src: *const u8, dst: *mut u8) {
    // SAFETY: the caller guarantees `src` holds a live `T` and `dst` is a
    // writable slot aligned for `T`.
    unsafe { dst.cast::<T>().write((*src.cast::<T>()).clone()) }
}

unsafe fn drop_raw<T: Component>(ptr: *mut u8) {
    // SAFETY: the caller guarantees `ptr` holds a live `T`.
    unsafe { ptr.cast::<T>().drop_in_place() }
}

unsafe fn serialize_raw<T: Component>(src: *const u8) -> Result<Value, serde_json::Error> {
    // SAFETY: the caller guarantees `src` holds a live `T`.
    serde_json::to_value(unsafe { &*src.cast::<T>() })
}

unsafe fn deserialize_raw<T: Component>(
    value: &Value,
    dst: *mut u8,
) -> Result<(), serde_json::Error> {
    let parsed: T = serde_json::from_value(value.clone())?;
    // SAFETY: the caller guarantees `dst` holds a live `T`; assignment
    // drops the old value.
    unsafe { *dst.cast::<T>() = parsed };
    Ok(())
}

/// The process-wide component type registry.
///
/// Built once via [`TypeRegistry::builder`] and shared (typically behind an
/// `Arc`) by every Space in the process.
#[derive(Debug)]
pub struct TypeRegistry {
    infos: Vec<TypeInfo>,
    by_name: HashMap<&'static str, TypeId>,
    by_rust_type: HashMap<std::any::TypeId, TypeId>,
}

impl TypeRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder {
            registry: TypeRegistry {
                infos: Vec::new(),
                by_name: HashMap::new(),
                by_rust_type: HashMap::new(),
            },
        }
    }

    /// Metadata for a registered type.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this registry.
    #[track_caller]
    #[must_use]
    pub fn info(&self, id: TypeId) -> &TypeInfo {
        match self.infos.get(id.0 as usize) {
            Some(info) => info,
            None => panic!("{id} is not a registered component type"),
        }
    }

    /// The id assigned to `T`, if `T` was registered.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<TypeId> {
        self.by_rust_type
            .get(&std::any::TypeId::of::<T>())
            .copied()
    }

    /// The id assigned to `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` was not registered.
    #[track_caller]
    #[must_use]
    pub fn require<T: Component>(&self) -> TypeId {
        match self.get::<T>() {
            Some(id) => id,
            None => panic!(
                "component type {} has not been registered",
                T::type_name()
            ),
        }
    }

    /// Look a type up by its persisted name.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` if no types were registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterate over all registered types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.infos.iter()
    }
}

/// Builder for a [`TypeRegistry`]. Registration order is id order.
#[derive(Debug)]
pub struct TypeRegistryBuilder {
    registry: TypeRegistry,
}

impl TypeRegistryBuilder {
    /// Register a component type and assign it the next [`TypeId`].
    ///
    /// # Panics
    ///
    /// Panics if `T` or another type with the same name was already
    /// registered.
    #[track_caller]
    pub fn register<T: Component>(&mut self) -> TypeId {
        let registry = &mut self.registry;
        let name = T::type_name();
        assert!(
            !registry.by_name.contains_key(name),
            "component type {name} is already registered"
        );
        let id = TypeId(registry.infos.len() as u32);
        registry.infos.push(TypeInfo::of::<T>(id));
        registry.by_name.insert(name, id);
        registry
            .by_rust_type
            .insert(std::any::TypeId::of::<T>(), id);
        id
    }

    /// Declare that `T` depends on `D`: a member holding `T` is expected to
    /// also hold `D`, and the Space ensures `D` when `T` is added.
    ///
    /// # Panics
    ///
    /// Panics if either type was not registered yet.
    #[track_caller]
    pub fn depend<T: Component, D: Component>(&mut self) {
        let dependant = self.registered_id::<T>();
        let dependency = self.registered_id::<D>();
        let registry = &mut self.registry;
        if !registry.infos[dependant.0 as usize]
            .dependencies
            .contains(&dependency)
        {
            registry.infos[dependant.0 as usize]
                .dependencies
                .push(dependency);
            registry.infos[dependency.0 as usize]
                .dependants
                .push(dependant);
        }
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> TypeRegistry {
        self.registry
    }

    #[track_caller]
    fn registered_id<T: Component>(&self) -> TypeId {
        match self.registry.get::<T>() {
            Some(id) => id,
            None => panic!(
                "component type {} must be registered before declaring dependencies",
                T::type_name()
            ),
        }
    }
}
