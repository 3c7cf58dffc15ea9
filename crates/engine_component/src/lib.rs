//! # engine_component
//!
//! Component identity, registration, and physical storage for the entity
//! storage core.
//!
//! This crate provides:
//!
//! - [`MemberId`] — lightweight member (entity) identifiers.
//! - [`Component`] trait — the contract all member data must satisfy.
//! - [`TypeRegistry`] — explicit, build-once registry assigning [`TypeId`]s
//!   in registration order, holding per-type layout, dependencies, and
//!   type-erased value operations.
//! - [`Table`] — dense per-type storage with swap-removal and owner
//!   tracking.
//! - Descriptor-file versioning ([`descriptor`]) guarding persisted data
//!   against silently resized or renamed component structs.

pub mod component;
pub mod descriptor;
pub mod member;
pub mod registry;
pub mod table;

pub use component::{Component, TypeId};
pub use descriptor::{DescriptorError, DescriptorReport, SizeDrift};
pub use member::MemberId;
pub use registry::{TypeInfo, TypeRegistry, TypeRegistryBuilder};
pub use table::{Displaced, GROWTH_FACTOR, START_CAPACITY, Table};
