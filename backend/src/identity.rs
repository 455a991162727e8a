//! Identity resolver
//!
//! Best-effort resolution of a type's symbolic name (e.g. `Excel.Application`)
//! and binary identity (its braced class id). Each half resolves on its own
//! and falls back to `"Unknown"`; failures are logged at debug level and
//! never reach the caller.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::UNKNOWN;
use crate::runtime::{AutomationRuntime, ForeignObject};

/// How a caller-supplied identifier should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Braced binary identity, `{...}`
    ClassId,

    /// Anything else
    SymbolicName,
}

impl IdentifierKind {
    /// # Example
    /// ```
    /// use automation_bridge_core::identity::IdentifierKind;
    ///
    /// assert_eq!(
    ///     IdentifierKind::of("{00020400-0000-0000-C000-000000000046}"),
    ///     IdentifierKind::ClassId
    /// );
    /// assert_eq!(IdentifierKind::of("Word.Application"), IdentifierKind::SymbolicName);
    /// ```
    pub fn of(identifier: &str) -> Self {
        if identifier.starts_with('{') && identifier.ends_with('}') {
            IdentifierKind::ClassId
        } else {
            IdentifierKind::SymbolicName
        }
    }
}

/// Resolved (or defaulted) name and identity of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeIdentity {
    pub type_name: String,
    pub type_identity: String,
}

impl TypeIdentity {
    pub fn unknown() -> Self {
        Self {
            type_name: UNKNOWN.to_string(),
            type_identity: UNKNOWN.to_string(),
        }
    }

    pub fn is_fully_known(&self) -> bool {
        self.type_name != UNKNOWN && self.type_identity != UNKNOWN
    }
}

impl Default for TypeIdentity {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Resolve the identifier a caller used to create an object
pub fn resolve_identifier<R>(runtime: &R, identifier: &str) -> TypeIdentity
where
    R: AutomationRuntime + ?Sized,
{
    match IdentifierKind::of(identifier) {
        IdentifierKind::ClassId => TypeIdentity {
            type_name: name_for(runtime, identifier),
            type_identity: identifier.to_string(),
        },
        IdentifierKind::SymbolicName => TypeIdentity {
            type_name: identifier.to_string(),
            type_identity: runtime.class_id_from_name(identifier).unwrap_or_else(|e| {
                debug!(identifier, error = %e, "Failed to get class id");
                UNKNOWN.to_string()
            }),
        },
    }
}

/// Resolve the identity of a live reference
pub fn resolve_object<R>(runtime: &R, object: &dyn ForeignObject) -> TypeIdentity
where
    R: AutomationRuntime + ?Sized,
{
    match object.class_id() {
        Ok(class_id) => TypeIdentity {
            type_name: name_for(runtime, &class_id),
            type_identity: class_id,
        },
        Err(e) => {
            debug!(error = %e, "Failed to get class id");
            TypeIdentity::unknown()
        }
    }
}

fn name_for<R>(runtime: &R, class_id: &str) -> String
where
    R: AutomationRuntime + ?Sized,
{
    runtime.name_from_class_id(class_id).unwrap_or_else(|e| {
        debug!(class_id, error = %e, "Failed to get symbolic name");
        UNKNOWN.to_string()
    })
}
