//! Type description snapshot returned by `GetTypeInformation`
//!
//! This is a best-effort view: dynamic objects may refuse to reveal
//! individual members, and those refusals are reported alongside the members
//! that could be read.

use serde::{Deserialize, Serialize};

/// Sentinel used whenever a name, identity or signature cannot be resolved
pub const UNKNOWN: &str = "Unknown";

/// A callable member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub is_private: bool,
    /// Signature text, or `"Unknown"`
    pub signature: String,
}

/// A readable, non-callable member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    /// Runtime type name of the current value
    #[serde(rename = "type")]
    pub type_name: String,
    pub is_private: bool,
    /// Whether the current value is itself a foreign object
    pub is_foreign_object: bool,
}

/// A member that could not be inspected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberError {
    pub member: String,
    pub error: String,
}

/// Categorized members of a foreign object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDescription {
    pub methods: Vec<MethodInfo>,
    pub properties: Vec<PropertyInfo>,
    pub events: Vec<String>,
    pub errors_encountered: Vec<MemberError>,
}

impl TypeDescription {
    /// Find a method by name
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Find a property by name
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Total number of members seen, readable or not
    pub fn member_count(&self) -> usize {
        self.methods.len() + self.properties.len() + self.events.len() + self.errors_encountered.len()
    }
}

/// Members with a leading underscore are reported as private
pub fn is_private_member(name: &str) -> bool {
    name.starts_with('_')
}

/// Event handler heuristic: `on` followed by an uppercase letter
///
/// # Example
/// ```
/// use automation_bridge_core::models::type_info::looks_like_event;
///
/// assert!(looks_like_event("onClick"));
/// assert!(!looks_like_event("online"));
/// assert!(!looks_like_event("on"));
/// ```
pub fn looks_like_event(name: &str) -> bool {
    name.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_members() {
        assert!(is_private_member("_NewEnum"));
        assert!(!is_private_member("Visible"));
    }

    #[test]
    fn test_event_heuristic_edge_cases() {
        assert!(looks_like_event("onQuit"));
        assert!(looks_like_event("onÉvénement"));
        assert!(!looks_like_event("OnQuit"));
        assert!(!looks_like_event("one"));
        assert!(!looks_like_event(""));
    }

    #[test]
    fn test_property_type_field_name() {
        let prop = PropertyInfo {
            name: "Visible".to_string(),
            type_name: "bool".to_string(),
            is_private: false,
            is_foreign_object: false,
        };
        let json = serde_json::to_value(&prop).unwrap();
        assert_eq!(json["type"], "bool");
    }
}
