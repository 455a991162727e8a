//! Best-effort type introspection
//!
//! Walks every discoverable member of an object and sorts it into methods,
//! properties and events. A member that refuses inspection is recorded in
//! `errors_encountered` and the walk continues; only a failure to enumerate
//! at all aborts.

use crate::classifier::is_foreign_object;
use crate::models::type_info::{is_private_member, looks_like_event};
use crate::models::{MemberError, MethodInfo, PropertyInfo, TypeDescription, UNKNOWN};
use crate::runtime::{ForeignError, ForeignObject, Member};

/// Build a [`TypeDescription`] for `object`
pub fn describe_object(object: &dyn ForeignObject) -> Result<TypeDescription, ForeignError> {
    let mut description = TypeDescription::default();

    for name in object.enumerate_members()? {
        match object.inspect_member(&name) {
            Ok(Member::Method { signature }) => description.methods.push(MethodInfo {
                is_private: is_private_member(&name),
                signature: signature.unwrap_or_else(|| UNKNOWN.to_string()),
                name,
            }),
            Ok(Member::Property(_)) if looks_like_event(&name) => description.events.push(name),
            Ok(Member::Property(value)) => description.properties.push(PropertyInfo {
                type_name: value.type_name().to_string(),
                is_private: is_private_member(&name),
                is_foreign_object: is_foreign_object(&value),
                name,
            }),
            Err(e) => description.errors_encountered.push(MemberError {
                member: name,
                error: e.to_string(),
            }),
        }
    }

    Ok(description)
}
