//! Core [`Component`] trait and component type identity.
//!
//! Every piece of data attached to a member must implement [`Component`].
//! The trait bounds give the registry everything it needs to manage values
//! generically: `Default` for type-erased construction, `Clone` for
//! duplication, and serde for persistence.
//!
//! [`TypeId`]s are assigned by the [`TypeRegistry`](crate::TypeRegistry) in
//! registration-call order and are never reassigned while the registry
//! lives. Serialized documents refer to components by *name*, so ids are
//! free to differ between builds as long as names and sizes stay stable —
//! the descriptor file check in [`crate::descriptor`] watches over that.

use serde::{Serialize, de::DeserializeOwned};

/// A unique identifier for a component type, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The null / invalid type sentinel.
    pub const INVALID: TypeId = TypeId(u32::MAX);

    /// Returns `true` if this id is not the invalid sentinel.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Type({})", self.0)
    }
}

/// The core component trait.
///
/// Components are plain data records. `Default` is the type-erased
/// constructor the table uses for `add`, `Clone` backs duplication, and the
/// serde bounds back persistence through the structured document format.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use engine_component::Component;
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Clone + Default + Serialize + DeserializeOwned + 'static {
    /// A human-readable name for this component type. Persisted documents
    /// key component data by this name, so it must stay stable across
    /// builds that share saved data.
    fn type_name() -> &'static str;
}
