//! Space persistence.
//!
//! A Space serializes to a structured document of the form
//!
//! ```json
//! {
//!   "Members": [
//!     { "Id": 0, "Components": [ { "Type": "Transform", "Value": { ... } } ] }
//!   ]
//! }
//! ```
//!
//! Components appear in each member's run order, so loading a document into
//! a fresh Space reproduces both values and layout. Member ids are
//! preserved exactly; ids absent from the document stay allocatable.
//!
//! Loading is lenient about data problems: a component whose type is no
//! longer registered, or whose value no longer parses, is logged and
//! skipped (the value stays at its default) rather than failing the whole
//! load. A structurally broken document is an error.

use serde_json::{Value, json};
use thiserror::Error;

use engine_component::MemberId;

use crate::space::Space;

const MEMBERS_KEY: &str = "Members";
const ID_KEY: &str = "Id";
const COMPONENTS_KEY: &str = "Components";
const TYPE_KEY: &str = "Type";
const VALUE_KEY: &str = "Value";

/// Errors loading a Space from a document.
#[derive(Debug, Error)]
pub enum SpaceError {
    /// Loading only targets a Space with no members.
    #[error("the space must be empty before a document can be loaded")]
    NotEmpty,
    /// The document's structure does not match the expected form.
    #[error("malformed space document: {0}")]
    Malformed(String),
}

impl Space {
    /// Serialize every member and component into a document value.
    ///
    /// A component value that fails to serialize is logged and omitted;
    /// everything else is still written.
    #[must_use]
    pub fn serialize(&self) -> Value {
        let mut member_values = Vec::with_capacity(self.members.len());
        for &member_id in self.members.ids() {
            let member = self.members[member_id];
            let mut component_values = Vec::with_capacity(member.component_count);
            for row in member.address_index..member.end_address() {
                let address = self.run_entry(row);
                let table = &self.tables[&address.type_id];
                match table.serialize_slot(address.table_index) {
                    Ok(value) => component_values.push(json!({
                        TYPE_KEY: table.type_name(),
                        VALUE_KEY: value,
                    })),
                    Err(error) => tracing::error!(
                        member = %member_id,
                        component = table.type_name(),
                        %error,
                        "failed to serialize a component; omitting it"
                    ),
                }
            }
            member_values.push(json!({
                ID_KEY: member_id.0,
                COMPONENTS_KEY: component_values,
            }));
        }
        json!({ MEMBERS_KEY: member_values })
    }

    /// Load members and components from a document produced by
    /// [`Space::serialize`].
    ///
    /// Members are recreated under their recorded ids first, then
    /// components are added and filled in per member. Unknown component
    /// types and unparseable values are logged and skipped.
    pub fn deserialize(&mut self, document: &Value) -> Result<(), SpaceError> {
        if self.member_count() != 0 {
            return Err(SpaceError::NotEmpty);
        }
        let member_values = document
            .get(MEMBERS_KEY)
            .and_then(Value::as_array)
            .ok_or_else(|| SpaceError::Malformed(format!("missing \"{MEMBERS_KEY}\" array")))?;

        // First pass: claim every recorded id so hierarchy links inside
        // component values resolve no matter their order in the document.
        let mut member_ids = Vec::with_capacity(member_values.len());
        for member_value in member_values {
            let member_id = parse_member_id(member_value)?;
            if self.valid_member(member_id) {
                return Err(SpaceError::Malformed(format!(
                    "duplicate member id {}",
                    member_id.0
                )));
            }
            self.create_member_at(member_id);
            member_ids.push(member_id);
        }

        // Second pass: attach and fill components in recorded run order.
        for (member_value, &member_id) in member_values.iter().zip(&member_ids) {
            let component_values = member_value
                .get(COMPONENTS_KEY)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for component_value in component_values {
                self.load_component(member_id, component_value);
            }
        }
        Ok(())
    }

    fn load_component(&mut self, member_id: MemberId, component_value: &Value) {
        let Some(type_name) = component_value.get(TYPE_KEY).and_then(Value::as_str) else {
            tracing::error!(
                member = %member_id,
                "component record without a \"{TYPE_KEY}\" name; skipping it"
            );
            return;
        };
        let Some(type_id) = self.registry.id_by_name(type_name) else {
            tracing::error!(
                member = %member_id,
                component = type_name,
                "component type is not registered; skipping it"
            );
            return;
        };
        // Dependency ensuring may already have attached this type while a
        // dependant earlier in the run was added.
        if !self.has_component_dyn(type_id, member_id) {
            self.add_dyn(type_id, member_id);
        }
        let Some(value) = component_value.get(VALUE_KEY) else {
            tracing::error!(
                member = %member_id,
                component = type_name,
                "component record without a \"{VALUE_KEY}\"; keeping the default value"
            );
            return;
        };
        let member = self.members[member_id];
        let address = (member.address_index..member.end_address())
            .map(|row| self.run_entry(row))
            .find(|address| address.type_id == type_id);
        if let Some(address) = address {
            let result = self
                .table_mut(type_id)
                .deserialize_slot(address.table_index, value);
            if let Err(error) = result {
                tracing::error!(
                    member = %member_id,
                    component = type_name,
                    %error,
                    "failed to parse a component value; keeping the default value"
                );
            }
        }
    }
}

fn parse_member_id(member_value: &Value) -> Result<MemberId, SpaceError> {
    let id = member_value
        .get(ID_KEY)
        .and_then(Value::as_u64)
        .ok_or_else(|| SpaceError::Malformed(format!("member without an \"{ID_KEY}\"")))?;
    if id >= u64::from(u32::MAX) {
        return Err(SpaceError::Malformed(format!("member id {id} out of range")));
    }
    Ok(MemberId(id as u32))
}
