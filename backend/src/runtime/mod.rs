//! Foreign automation runtime interface
//!
//! The bridge never talks to a concrete object model directly. A binding
//! implements two traits:
//!
//! - [`AutomationRuntime`]: process-level services (instantiate by identifier,
//!   translate between symbolic names and class ids)
//! - [`ForeignObject`]: late-bound access to one native reference (member
//!   enumeration, get/set/invoke, interface negotiation, release)
//!
//! Values coming back from a binding are [`ForeignValue`]s: plain data plus
//! whatever the binding reveals about the value's runtime shape. The
//! classifier decides from that shape whether the value is an object.
//!
//! This crate ships one binding, [`memory::MemoryRuntime`], driven by a JSON
//! [`catalog::Catalog`].

pub mod catalog;
pub mod memory;

use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub use catalog::{Behavior, Catalog, CatalogError, ClassDef, MethodDef, PropertyDef};
pub use memory::MemoryRuntime;

/// Owned native reference
///
/// Dropping an `ObjectRef` must release it; [`ForeignObject::release`] does the
/// same but reports failure.
pub type ObjectRef = Box<dyn ForeignObject>;

/// Errors raised by a binding
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForeignError {
    #[error("Invalid class string: {0}")]
    ClassNotRegistered(String),

    #[error("No such interface supported: {0}")]
    NoInterface(String),

    #[error("Unknown name: {0}")]
    UnknownMember(String),

    #[error("Member '{0}' is read-only")]
    ReadOnly(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Exception occurred: {0}")]
    Exception(String),

    #[error("Class id not available: {0}")]
    NoClassId(String),

    #[error("Release failed: {0}")]
    ReleaseFailed(String),
}

/// What inspecting a member revealed
#[derive(Debug)]
pub enum Member {
    /// Callable member, with signature text when the binding knows it
    Method { signature: Option<String> },

    /// Readable member and its current value
    Property(ForeignValue),
}

/// Process-level services of a binding
pub trait AutomationRuntime {
    /// Instantiate by symbolic name or braced class id
    fn create_instance(&self, identifier: &str) -> Result<ObjectRef, ForeignError>;

    /// Class id registered for a symbolic name
    fn class_id_from_name(&self, name: &str) -> Result<String, ForeignError>;

    /// Symbolic name registered for a class id
    fn name_from_class_id(&self, class_id: &str) -> Result<String, ForeignError>;
}

/// Late-bound access to one native reference
pub trait ForeignObject: fmt::Debug {
    /// Names of all discoverable members
    fn enumerate_members(&self) -> Result<Vec<String>, ForeignError>;

    /// Classify one member as method or property (reading the property)
    fn inspect_member(&self, name: &str) -> Result<Member, ForeignError>;

    /// Read a property
    fn get_member(&self, name: &str) -> Result<ForeignValue, ForeignError>;

    /// Write a property
    fn set_member(&self, name: &str, value: Value) -> Result<(), ForeignError>;

    /// Call a method
    fn invoke_member(&self, name: &str, args: &[Value]) -> Result<ForeignValue, ForeignError>;

    /// Reinterpret this reference as another interface
    fn query_interface(&self, interface_id: &str) -> Result<ObjectRef, ForeignError>;

    /// Class id of the concrete type
    fn class_id(&self) -> Result<String, ForeignError>;

    /// Release the reference, reporting failure
    fn release(self: Box<Self>) -> Result<(), ForeignError>;
}

/// A value returned by a binding, before classification
///
/// `reference` is set when the binding can hand over a native reference for
/// the value. Whether the value is treated as an object is still up to the
/// classifier; an unclaimed reference is dropped with the value.
#[derive(Debug)]
pub struct ForeignValue {
    data: Value,
    type_name: String,
    module: String,
    rendering: String,
    object_marker: bool,
    reference: Option<ObjectRef>,
}

impl ForeignValue {
    /// Plain data, described the way the binding describes builtin values
    pub fn plain(data: Value) -> Self {
        let type_name = plain_type_name(&data).to_string();
        let rendering = render_plain(&data);
        Self {
            data,
            type_name,
            module: "builtins".to_string(),
            rendering,
            object_marker: false,
            reference: None,
        }
    }

    /// Object value exposing the low-level object marker
    pub fn object(reference: ObjectRef, type_name: impl Into<String>, rendering: impl Into<String>) -> Self {
        let rendering = rendering.into();
        Self {
            data: Value::String(rendering.clone()),
            type_name: type_name.into(),
            module: String::new(),
            rendering,
            object_marker: true,
            reference: Some(reference),
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_rendering(mut self, rendering: impl Into<String>) -> Self {
        self.rendering = rendering.into();
        self
    }

    pub fn with_object_marker(mut self, marker: bool) -> Self {
        self.object_marker = marker;
        self
    }

    pub fn with_reference(mut self, reference: ObjectRef) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn rendering(&self) -> &str {
        &self.rendering
    }

    pub fn has_object_marker(&self) -> bool {
        self.object_marker
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Split into plain data and the (optional) native reference
    pub fn into_parts(self) -> (Value, Option<ObjectRef>) {
        (self.data, self.reference)
    }
}

/// Builtin type names for plain JSON data
pub fn plain_type_name(data: &Value) -> &'static str {
    match data {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "tuple",
        Value::Object(_) => "dict",
    }
}

fn render_plain(data: &Value) -> String {
    match data {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
