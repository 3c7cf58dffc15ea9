//! # engine_space
//!
//! The Space layer of the entity storage core: member lifecycle over a
//! recycled id pool, per-member component address runs, the parent/child
//! hierarchy, and document persistence.
//!
//! A [`Space`] resolves component types against a shared
//! [`TypeRegistry`](engine_component::TypeRegistry); build the registry once
//! at startup (calling [`register_core_types`] for the components this crate
//! defines) and hand every Space the same `Arc`.

pub mod object;
pub mod relationship;
pub mod serial;
pub mod space;

pub use object::Object;
pub use relationship::Relationship;
pub use serial::SpaceError;
pub use space::{ComponentAddress, Space};

use engine_component::TypeRegistryBuilder;

/// Register the component types this crate defines.
///
/// Call this before application types so core types keep stable low ids.
pub fn register_core_types(builder: &mut TypeRegistryBuilder) {
    builder.register::<Relationship>();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use engine_component::TypeRegistry;

    use super::*;

    #[test]
    fn test_core_types_are_registered() {
        let mut builder = TypeRegistry::builder();
        register_core_types(&mut builder);
        let registry = builder.build();
        assert!(registry.get::<Relationship>().is_some());
        assert_eq!(registry.id_by_name("Relationship"), registry.get::<Relationship>());
    }

    #[test]
    fn test_space_over_core_registry() {
        let mut builder = TypeRegistry::builder();
        register_core_types(&mut builder);
        let mut space = Space::new(Arc::new(builder.build()));
        let parent = space.create_member();
        let child = space.create_child_member(parent);
        assert_eq!(space.parent_of(child), Some(parent));
    }
}
