//! Parent/child hierarchy component.
//!
//! A [`Relationship`] holds one member's links: an optional parent and an
//! ordered list of children. Link symmetry (`a.parent == b` implies
//! `b.children` contains `a`) is maintained exclusively by the Space's
//! create/delete/reparent operations — the component never mutates the
//! other side of a link itself.

use engine_component::{Component, MemberId};
use serde::{Deserialize, Serialize};

/// Hierarchy links of one member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    /// The parent member, or [`MemberId::INVALID`] for none.
    pub parent: MemberId,
    /// Children in attachment order.
    pub children: Vec<MemberId>,
}

impl Relationship {
    /// Returns `true` if a parent link exists.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent.is_valid()
    }

    /// Returns `true` if any child links exist.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns `true` if any link exists in either direction.
    #[must_use]
    pub fn has_relationship(&self) -> bool {
        self.has_parent() || self.has_children()
    }

    /// Clear the parent link.
    ///
    /// # Panics
    ///
    /// Panics if there is no parent link.
    #[track_caller]
    pub fn nullify_parent(&mut self) {
        assert!(self.has_parent(), "there is no parent relationship");
        self.parent = MemberId::INVALID;
    }

    /// Remove one child link, keeping the remaining children in order.
    ///
    /// # Panics
    ///
    /// Panics if `child_id` is not a child.
    #[track_caller]
    pub fn nullify_child(&mut self, child_id: MemberId) {
        match self.children.iter().position(|&child| child == child_id) {
            Some(index) => {
                self.children.remove(index);
            }
            None => panic!("{child_id} is not a child of this member"),
        }
    }
}

impl Default for Relationship {
    fn default() -> Self {
        Self {
            parent: MemberId::INVALID,
            children: Vec::new(),
        }
    }
}

impl Component for Relationship {
    fn type_name() -> &'static str {
        "Relationship"
    }
}
