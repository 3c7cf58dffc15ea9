//! Convenience handle pairing a Space with one of its members.
//!
//! An [`Object`] borrows the Space mutably, so it is a short-lived working
//! handle, not a stored reference. The id it wraps can outlive the handle;
//! [`Object::valid`] reports whether it still names a live member.

use engine_component::{Component, MemberId};

use crate::space::Space;

/// A member id bound to the Space it lives in.
pub struct Object<'a> {
    space: &'a mut Space,
    member: MemberId,
}

impl<'a> Object<'a> {
    /// The wrapped member id.
    #[must_use]
    pub fn id(&self) -> MemberId {
        self.member
    }

    /// Returns `true` if the id still names a live member.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.space.valid_member(self.member)
    }

    /// See [`Space::add`].
    #[track_caller]
    pub fn add<T: Component>(&mut self) -> &mut T {
        self.space.add::<T>(self.member)
    }

    /// See [`Space::ensure`].
    #[track_caller]
    pub fn ensure<T: Component>(&mut self) -> &mut T {
        self.space.ensure::<T>(self.member)
    }

    /// See [`Space::rem`].
    #[track_caller]
    pub fn rem<T: Component>(&mut self) {
        self.space.rem::<T>(self.member);
    }

    /// See [`Space::try_rem`].
    #[track_caller]
    pub fn try_rem<T: Component>(&mut self) -> bool {
        self.space.try_rem::<T>(self.member)
    }

    /// See [`Space::get`].
    #[track_caller]
    #[must_use]
    pub fn get<T: Component>(&self) -> &T {
        self.space.get::<T>(self.member)
    }

    /// See [`Space::get_mut`].
    #[track_caller]
    #[must_use]
    pub fn get_mut<T: Component>(&mut self) -> &mut T {
        self.space.get_mut::<T>(self.member)
    }

    /// See [`Space::try_get`].
    #[must_use]
    pub fn try_get<T: Component>(&self) -> Option<&T> {
        self.space.try_get::<T>(self.member)
    }

    /// See [`Space::has_component`].
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.space.has_component::<T>(self.member)
    }

    /// Create a child of this member and return its id.
    pub fn create_child(&mut self) -> MemberId {
        self.space.create_child_member(self.member)
    }

    /// See [`Space::duplicate_member`].
    #[track_caller]
    pub fn duplicate(&mut self) -> MemberId {
        self.space.duplicate_member(self.member)
    }

    /// See [`Space::parent_of`].
    #[track_caller]
    #[must_use]
    pub fn parent(&self) -> Option<MemberId> {
        self.space.parent_of(self.member)
    }

    /// See [`Space::children_of`].
    #[track_caller]
    #[must_use]
    pub fn children(&self) -> &[MemberId] {
        self.space.children_of(self.member)
    }

    /// Delete the member, consuming the handle.
    #[track_caller]
    pub fn delete(self) {
        self.space.delete_member(self.member);
    }
}

impl std::fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("member", &self.member)
            .field("valid", &self.valid())
            .finish()
    }
}

impl Space {
    /// A working handle for an existing member.
    #[must_use]
    pub fn object(&mut self, member_id: MemberId) -> Object<'_> {
        Object {
            space: self,
            member: member_id,
        }
    }

    /// Create a member and return a handle to it.
    pub fn create_object(&mut self) -> Object<'_> {
        let member = self.create_member();
        Object {
            space: self,
            member,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};

    use engine_component::{Component, TypeRegistry};

    use super::*;
    use crate::relationship::Relationship;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct Tag {
        name: String,
    }

    impl Component for Tag {
        fn type_name() -> &'static str {
            "Tag"
        }
    }

    fn make_space() -> Space {
        let mut builder = TypeRegistry::builder();
        builder.register::<Relationship>();
        builder.register::<Tag>();
        Space::new(Arc::new(builder.build()))
    }

    #[test]
    fn test_object_component_surface() {
        let mut space = make_space();
        let id = {
            let mut object = space.create_object();
            object.add::<Tag>().name = "crate".to_string();
            object.id()
        };
        assert_eq!(space.object(id).get::<Tag>().name, "crate");
        assert!(space.object(id).try_rem::<Tag>());
        assert!(!space.object(id).has::<Tag>());
    }

    #[test]
    fn test_object_hierarchy_and_delete() {
        let mut space = make_space();
        let parent = space.create_object().id();
        let child = space.object(parent).create_child();
        assert_eq!(space.object(child).parent(), Some(parent));

        space.object(parent).delete();
        assert!(!space.object(parent).valid());
        assert!(!space.object(child).valid());
    }

    #[test]
    fn test_object_duplicate() {
        let mut space = make_space();
        let source = space.create_object().id();
        space.object(source).add::<Tag>().name = "original".to_string();
        let copy = space.object(source).duplicate();
        assert_ne!(copy, source);
        assert_eq!(space.object(copy).get::<Tag>().name, "original");
    }
}
