//! Value classifier
//!
//! Decides whether a value returned by a dynamic call is a foreign object
//! (and must be wrapped in a new handle) or plain data that can cross the
//! protocol boundary as-is.
//!
//! Bindings do not tag return values with a reliable "object reference" bit:
//! property reads and method returns travel different paths and expose
//! different traits. Classification therefore runs an ordered list of
//! heuristic rules and the first match wins:
//!
//! 1. the value exposes the low-level object marker
//! 2. its runtime type name is a known dispatch-wrapper type
//! 3. its declaring module lives in the binding namespace
//! 4. its rendering looks like an object rendering
//!
//! This is best-effort, not a contract. A false negative hands the caller a
//! string rendering instead of a handle, which is lossy but safe. A false
//! positive would hide a real value behind a handle, so the rules stay
//! narrow. A matching rule can only wrap a value that carries a native
//! reference; otherwise the value passes through.

use serde_json::Value;
use tracing::{debug, trace};

use crate::runtime::{ForeignValue, ObjectRef};

/// Type names the dispatch binding gives to object wrappers
pub const DISPATCH_WRAPPER_TYPES: &[&str] = &["CDispatch", "CoClassBaseClass", "DispatchBaseClass"];

/// Module namespace of the dispatch binding
pub const BINDING_NAMESPACE: &str = "win32com";

/// Rendering prefix of dispatch objects
pub const OBJECT_RENDERING: &str = "<COMObject";

/// Classifier outcome
#[derive(Debug)]
pub enum Classification {
    /// Foreign object: register it and return a handle
    Wrap(ObjectRef),

    /// Plain data: return it directly
    PassThrough(Value),
}

impl Classification {
    pub fn is_wrap(&self) -> bool {
        matches!(self, Classification::Wrap(_))
    }
}

/// One named classification heuristic
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&ForeignValue) -> bool,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Rule").field(&self.name).finish()
    }
}

/// Rule 1: low-level object marker
pub fn has_object_marker(value: &ForeignValue) -> bool {
    value.has_object_marker()
}

/// Rule 2: dispatch wrapper type name
pub fn is_dispatch_wrapper_type(value: &ForeignValue) -> bool {
    DISPATCH_WRAPPER_TYPES.contains(&value.type_name())
}

/// Rule 3: declared in the binding namespace
pub fn is_binding_module(value: &ForeignValue) -> bool {
    value.module().contains(BINDING_NAMESPACE)
}

/// Rule 4: object-style rendering
pub fn has_object_rendering(value: &ForeignValue) -> bool {
    value.rendering().contains(OBJECT_RENDERING)
}

/// Default rule order
pub const DEFAULT_RULES: &[Rule] = &[
    Rule {
        name: "object_marker",
        matches: has_object_marker,
    },
    Rule {
        name: "dispatch_wrapper_type",
        matches: is_dispatch_wrapper_type,
    },
    Rule {
        name: "binding_module",
        matches: is_binding_module,
    },
    Rule {
        name: "object_rendering",
        matches: has_object_rendering,
    },
];

/// First rule that recognizes `value` as an object
pub fn matching_rule<'r>(rules: &'r [Rule], value: &ForeignValue) -> Option<&'r Rule> {
    rules.iter().find(|rule| (rule.matches)(value))
}

/// Whether the default rules consider `value` a foreign object
pub fn is_foreign_object(value: &ForeignValue) -> bool {
    matching_rule(DEFAULT_RULES, value).is_some()
}

/// Classify with the default rules
pub fn classify(value: ForeignValue) -> Classification {
    classify_with(DEFAULT_RULES, value)
}

/// Classify with a custom rule list
///
/// # Example
/// ```
/// use automation_bridge_core::classifier::{classify, Classification};
/// use automation_bridge_core::runtime::ForeignValue;
/// use serde_json::json;
///
/// match classify(ForeignValue::plain(json!(42))) {
///     Classification::PassThrough(value) => assert_eq!(value, json!(42)),
///     Classification::Wrap(_) => unreachable!(),
/// }
/// ```
pub fn classify_with(rules: &[Rule], value: ForeignValue) -> Classification {
    let rule = matching_rule(rules, &value).map(|rule| rule.name);
    let (data, reference) = value.into_parts();

    match (rule, reference) {
        (Some(rule), Some(reference)) => {
            trace!(rule, "classified value as foreign object");
            Classification::Wrap(reference)
        }
        (Some(rule), None) => {
            debug!(rule, "object rule matched a value without a native reference");
            Classification::PassThrough(data)
        }
        (None, _) => Classification::PassThrough(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_values_never_match() {
        for data in [json!(null), json!(false), json!(42), json!(1.5), json!("text"), json!([1]), json!({"a": 1})] {
            let value = ForeignValue::plain(data);
            assert!(matching_rule(DEFAULT_RULES, &value).is_none());
        }
    }

    #[test]
    fn test_each_rule_in_isolation() {
        let marker = ForeignValue::plain(json!("x")).with_object_marker(true);
        assert_eq!(matching_rule(DEFAULT_RULES, &marker).unwrap().name, "object_marker");

        let wrapper = ForeignValue::plain(json!("x")).with_type_name("CoClassBaseClass");
        assert_eq!(matching_rule(DEFAULT_RULES, &wrapper).unwrap().name, "dispatch_wrapper_type");

        let module = ForeignValue::plain(json!("x")).with_module("win32com.gen_py.Excel");
        assert_eq!(matching_rule(DEFAULT_RULES, &module).unwrap().name, "binding_module");

        let rendering = ForeignValue::plain(json!("x")).with_rendering("<COMObject Open>");
        assert_eq!(matching_rule(DEFAULT_RULES, &rendering).unwrap().name, "object_rendering");
    }

    #[test]
    fn test_first_match_wins() {
        let value = ForeignValue::plain(json!("x"))
            .with_object_marker(true)
            .with_type_name("CDispatch");
        assert_eq!(matching_rule(DEFAULT_RULES, &value).unwrap().name, "object_marker");
    }

    #[test]
    fn test_match_without_reference_passes_through() {
        let value = ForeignValue::plain(json!("<COMObject Orphan>")).with_rendering("<COMObject Orphan>");
        match classify(value) {
            Classification::PassThrough(data) => assert_eq!(data, json!("<COMObject Orphan>")),
            Classification::Wrap(_) => panic!("wrapped a value without a reference"),
        }
    }

    #[test]
    fn test_empty_rule_list_passes_everything_through() {
        let value = ForeignValue::plain(json!(7)).with_object_marker(true);
        assert!(!classify_with(&[], value).is_wrap());
    }
}
