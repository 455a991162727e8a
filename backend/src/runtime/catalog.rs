//! Object model catalog for the in-memory runtime
//!
//! A catalog describes the classes the [`MemoryRuntime`](super::MemoryRuntime)
//! can instantiate: symbolic name, class id, supported interfaces, properties
//! and methods. Catalogs are JSON documents, loaded and validated up front so
//! the runtime never meets a dangling class reference.
//!
//! # Example
//!
//! ```
//! use automation_bridge_core::runtime::Catalog;
//!
//! let catalog = Catalog::from_json(r#"{
//!     "classes": [{
//!         "prog_id": "Calc.App",
//!         "clsid": "{0002DF01-0000-0000-C000-000000000046}",
//!         "properties": { "Visible": { "value": false } },
//!         "methods": { "Quit": {} }
//!     }]
//! }"#).unwrap();
//!
//! assert!(catalog.class_by_name("Calc.App").is_some());
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

const DEMO_CATALOG: &str = include_str!("../../catalogs/demo.json");

/// Errors that can occur when loading a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to load catalog from file: {0}")]
    LoadError(#[from] std::io::Error),

    #[error("Failed to parse catalog JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Class '{0}' is defined more than once")]
    DuplicateClass(String),

    #[error("Class '{class}': '{id}' is not a braced identifier")]
    InvalidIdentifier { class: String, id: String },

    #[error("Class '{class}': member '{member}' is both a property and a method")]
    DuplicateMember { class: String, member: String },

    #[error("Class '{class}': property '{property}' must have exactly one of value, object, unreadable")]
    InvalidProperty { class: String, property: String },

    #[error("Class '{class}': member '{member}' references unknown class '{target}'")]
    UnknownClass {
        class: String,
        member: String,
        target: String,
    },
}

/// Complete catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
}

/// One creatable (or reachable) class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    /// Symbolic name, e.g. `Excel.Application`
    pub prog_id: String,

    /// Braced class id; `None` means the class cannot report one
    #[serde(default)]
    pub clsid: Option<String>,

    /// Interface ids accepted by QueryInterface, besides IUnknown/IDispatch
    #[serde(default)]
    pub interfaces: Vec<String>,

    /// Make every release of this class's references fail
    #[serde(default)]
    pub release_fails: bool,

    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,

    #[serde(default)]
    pub methods: BTreeMap<String, MethodDef>,
}

/// Property definition
///
/// Exactly one of `value`, `object` or `unreadable` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Initial plain value (`null` allowed)
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Class of the child object this property yields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Error text raised whenever the property is read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreadable: Option<String>,

    #[serde(default)]
    pub read_only: bool,
}

/// Method definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodDef {
    #[serde(default)]
    pub signature: Option<String>,

    #[serde(default)]
    pub returns: Behavior,
}

/// What a method does when invoked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Return a fixed plain value
    Value(Value),

    /// Return a new instance of the named class
    Object(String),

    /// Return the numeric sum of the arguments
    Sum,

    /// Return the arguments as a list
    Echo,

    /// Raise an exception with this text
    Fail(String),
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Value(Value::Null)
    }
}

/// Keep an explicit `null` as `Some(Value::Null)`
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Braced identifier check (`{...}`)
pub fn is_braced(id: &str) -> bool {
    id.len() > 2 && id.starts_with('{') && id.ends_with('}')
}

impl Catalog {
    /// Parse and validate a catalog from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load, parse and validate a catalog file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The bundled demo object model
    pub fn demo() -> Result<Self, CatalogError> {
        Self::from_json(DEMO_CATALOG)
    }

    /// Find a class by symbolic name
    pub fn class_by_name(&self, prog_id: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.prog_id == prog_id)
    }

    /// Find a class by class id (case-insensitive)
    pub fn class_by_id(&self, clsid: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| {
            c.clsid
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(clsid))
        })
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();

        for class in &self.classes {
            if !names.insert(class.prog_id.as_str()) {
                return Err(CatalogError::DuplicateClass(class.prog_id.clone()));
            }

            if let Some(clsid) = &class.clsid {
                check_braced(class, clsid)?;
                if !ids.insert(clsid.to_ascii_lowercase()) {
                    return Err(CatalogError::DuplicateClass(clsid.clone()));
                }
            }

            for iid in &class.interfaces {
                check_braced(class, iid)?;
            }

            for (name, property) in &class.properties {
                if class.methods.contains_key(name) {
                    return Err(CatalogError::DuplicateMember {
                        class: class.prog_id.clone(),
                        member: name.clone(),
                    });
                }

                let kinds = [
                    property.value.is_some(),
                    property.object.is_some(),
                    property.unreadable.is_some(),
                ];
                if kinds.iter().filter(|set| **set).count() != 1 {
                    return Err(CatalogError::InvalidProperty {
                        class: class.prog_id.clone(),
                        property: name.clone(),
                    });
                }

                if let Some(target) = &property.object {
                    self.check_reference(class, name, target)?;
                }
            }

            for (name, method) in &class.methods {
                if let Behavior::Object(target) = &method.returns {
                    self.check_reference(class, name, target)?;
                }
            }
        }

        Ok(())
    }

    fn check_reference(&self, class: &ClassDef, member: &str, target: &str) -> Result<(), CatalogError> {
        if self.class_by_name(target).is_some() {
            Ok(())
        } else {
            Err(CatalogError::UnknownClass {
                class: class.prog_id.clone(),
                member: member.to_string(),
                target: target.to_string(),
            })
        }
    }
}

fn check_braced(class: &ClassDef, id: &str) -> Result<(), CatalogError> {
    if is_braced(id) {
        Ok(())
    } else {
        Err(CatalogError::InvalidIdentifier {
            class: class.prog_id.clone(),
            id: id.to_string(),
        })
    }
}
