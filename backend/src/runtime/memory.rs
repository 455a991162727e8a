//! In-process automation runtime
//!
//! Implements the runtime traits over a [`Catalog`]. Objects behave like
//! late-bound automation objects:
//!
//! - every interface view obtained through QueryInterface shares the state of
//!   the object it came from
//! - object-valued properties yield a child object, created on first read and
//!   owned by its parent; each read hands out a fresh reference to it
//! - object values carry the same markers a dynamic dispatch binding attaches
//!   (`CDispatch` type, `win32com.client.dynamic` module, `<COMObject ...>`
//!   rendering)
//!
//! Every reference handed out is counted until released or dropped, so tests
//! can observe leaks through [`MemoryRuntime::live_references`].

use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::catalog::{is_braced, Behavior, Catalog, CatalogError, ClassDef, PropertyDef};
use super::{AutomationRuntime, ForeignError, ForeignObject, ForeignValue, Member, ObjectRef};

/// IUnknown, accepted by every object
pub const IID_IUNKNOWN: &str = "{00000000-0000-0000-C000-000000000046}";

/// IDispatch, accepted by every object
pub const IID_IDISPATCH: &str = "{00020400-0000-0000-C000-000000000046}";

const DISPATCH_TYPE: &str = "CDispatch";
const DISPATCH_MODULE: &str = "win32com.client.dynamic";

struct Shared {
    catalog: Catalog,
    live: Cell<usize>,
}

impl Shared {
    fn class(&self, prog_id: &str) -> Result<&ClassDef, ForeignError> {
        self.catalog
            .class_by_name(prog_id)
            .ok_or_else(|| ForeignError::ClassNotRegistered(prog_id.to_string()))
    }
}

/// Catalog-driven runtime
///
/// # Example
/// ```
/// use automation_bridge_core::runtime::{AutomationRuntime, MemoryRuntime};
///
/// let runtime = MemoryRuntime::demo().unwrap();
/// let app = runtime.create_instance("Calc.App").unwrap();
/// assert_eq!(runtime.live_references(), 1);
///
/// app.release().unwrap();
/// assert_eq!(runtime.live_references(), 0);
/// ```
#[derive(Clone)]
pub struct MemoryRuntime {
    shared: Rc<Shared>,
}

impl MemoryRuntime {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            shared: Rc::new(Shared {
                catalog,
                live: Cell::new(0),
            }),
        }
    }

    /// Runtime over the bundled demo catalog
    pub fn demo() -> Result<Self, CatalogError> {
        Catalog::demo().map(Self::new)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.shared.catalog
    }

    /// References handed out and not yet released
    pub fn live_references(&self) -> usize {
        self.shared.live.get()
    }

    fn lookup_class(&self, identifier: &str) -> Option<&ClassDef> {
        if is_braced(identifier) {
            self.shared.catalog.class_by_id(identifier)
        } else {
            self.shared.catalog.class_by_name(identifier)
        }
    }
}

impl fmt::Debug for MemoryRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRuntime")
            .field("classes", &self.shared.catalog.classes.len())
            .field("live_references", &self.live_references())
            .finish()
    }
}

impl AutomationRuntime for MemoryRuntime {
    fn create_instance(&self, identifier: &str) -> Result<ObjectRef, ForeignError> {
        let class = self
            .lookup_class(identifier)
            .ok_or_else(|| ForeignError::ClassNotRegistered(identifier.to_string()))?;
        let instance = Instance::new(class);
        Ok(Box::new(MemoryObject::new(instance, None, &self.shared)))
    }

    fn class_id_from_name(&self, name: &str) -> Result<String, ForeignError> {
        let class = self.shared.class(name)?;
        class
            .clsid
            .clone()
            .ok_or_else(|| ForeignError::NoClassId(name.to_string()))
    }

    fn name_from_class_id(&self, class_id: &str) -> Result<String, ForeignError> {
        self.shared
            .catalog
            .class_by_id(class_id)
            .map(|class| class.prog_id.clone())
            .ok_or_else(|| ForeignError::ClassNotRegistered(class_id.to_string()))
    }
}

// ============================================================================
// Object state
// ============================================================================

enum Slot {
    Value(Value),
    Object {
        class: String,
        instance: Option<Rc<Instance>>,
    },
    Unreadable(String),
}

impl Slot {
    fn from_def(def: &PropertyDef) -> Self {
        if let Some(value) = &def.value {
            Slot::Value(value.clone())
        } else if let Some(class) = &def.object {
            Slot::Object {
                class: class.clone(),
                instance: None,
            }
        } else {
            Slot::Unreadable(def.unreadable.clone().unwrap_or_default())
        }
    }
}

struct Instance {
    class: String,
    slots: RefCell<BTreeMap<String, Slot>>,
}

impl Instance {
    fn new(def: &ClassDef) -> Rc<Self> {
        let slots = def
            .properties
            .iter()
            .map(|(name, property)| (name.clone(), Slot::from_def(property)))
            .collect();
        Rc::new(Self {
            class: def.prog_id.clone(),
            slots: RefCell::new(slots),
        })
    }
}

// ============================================================================
// References
// ============================================================================

/// One counted reference to an in-memory object
pub struct MemoryObject {
    instance: Rc<Instance>,
    interface: Option<String>,
    shared: Rc<Shared>,
}

impl MemoryObject {
    fn new(instance: Rc<Instance>, interface: Option<String>, shared: &Rc<Shared>) -> Self {
        shared.live.set(shared.live.get() + 1);
        Self {
            instance,
            interface,
            shared: Rc::clone(shared),
        }
    }

    fn class(&self) -> Result<&ClassDef, ForeignError> {
        self.shared.class(&self.instance.class)
    }

    fn object_value(&self, instance: Rc<Instance>) -> ForeignValue {
        let rendering = format!("<COMObject {}>", instance.class);
        let reference = MemoryObject::new(instance, None, &self.shared);
        ForeignValue::object(Box::new(reference), DISPATCH_TYPE, rendering).with_module(DISPATCH_MODULE)
    }

    fn new_object(&self, prog_id: &str) -> Result<ForeignValue, ForeignError> {
        let class = self.shared.class(prog_id)?;
        Ok(self.object_value(Instance::new(class)))
    }
}

impl Drop for MemoryObject {
    fn drop(&mut self) {
        self.shared.live.set(self.shared.live.get().saturating_sub(1));
    }
}

impl fmt::Debug for MemoryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryObject")
            .field("class", &self.instance.class)
            .field("interface", &self.interface)
            .finish()
    }
}

impl ForeignObject for MemoryObject {
    fn enumerate_members(&self) -> Result<Vec<String>, ForeignError> {
        let class = self.class()?;
        let mut members: Vec<String> = class
            .properties
            .keys()
            .chain(class.methods.keys())
            .cloned()
            .collect();
        members.sort();
        Ok(members)
    }

    fn inspect_member(&self, name: &str) -> Result<Member, ForeignError> {
        let class = self.class()?;
        if let Some(method) = class.methods.get(name) {
            return Ok(Member::Method {
                signature: method.signature.clone(),
            });
        }
        self.get_member(name).map(Member::Property)
    }

    fn get_member(&self, name: &str) -> Result<ForeignValue, ForeignError> {
        if self.class()?.methods.contains_key(name) {
            return Err(ForeignError::TypeMismatch(format!("'{}' is a method", name)));
        }

        let child = {
            let mut slots = self.instance.slots.borrow_mut();
            match slots.get_mut(name) {
                None => return Err(ForeignError::UnknownMember(name.to_string())),
                Some(Slot::Value(value)) => return Ok(ForeignValue::plain(value.clone())),
                Some(Slot::Unreadable(reason)) => return Err(ForeignError::Exception(reason.clone())),
                Some(Slot::Object { class, instance }) => match instance {
                    Some(existing) => Rc::clone(existing),
                    None => {
                        let created = Instance::new(self.shared.class(class)?);
                        *instance = Some(Rc::clone(&created));
                        created
                    }
                },
            }
        };

        Ok(self.object_value(child))
    }

    fn set_member(&self, name: &str, value: Value) -> Result<(), ForeignError> {
        let class = self.class()?;
        if class.methods.contains_key(name) {
            return Err(ForeignError::TypeMismatch(format!("'{}' is a method", name)));
        }
        let read_only = class
            .properties
            .get(name)
            .is_some_and(|property| property.read_only);

        let mut slots = self.instance.slots.borrow_mut();
        let slot = slots
            .get_mut(name)
            .ok_or_else(|| ForeignError::UnknownMember(name.to_string()))?;
        if read_only {
            return Err(ForeignError::ReadOnly(name.to_string()));
        }
        if let Slot::Object { class, .. } = slot {
            return Err(ForeignError::TypeMismatch(format!(
                "'{}' holds a {} object",
                name, class
            )));
        }
        *slot = Slot::Value(value);
        Ok(())
    }

    fn invoke_member(&self, name: &str, args: &[Value]) -> Result<ForeignValue, ForeignError> {
        let class = self.class()?;
        let method = match class.methods.get(name) {
            Some(method) => method,
            None if class.properties.contains_key(name) => {
                return Err(ForeignError::TypeMismatch(format!("'{}' is not callable", name)))
            }
            None => return Err(ForeignError::UnknownMember(name.to_string())),
        };

        match &method.returns {
            Behavior::Value(value) => Ok(ForeignValue::plain(value.clone())),
            Behavior::Object(prog_id) => self.new_object(prog_id),
            Behavior::Sum => sum(args).map(ForeignValue::plain),
            Behavior::Echo => Ok(ForeignValue::plain(Value::Array(args.to_vec()))),
            Behavior::Fail(reason) => Err(ForeignError::Exception(reason.clone())),
        }
    }

    fn query_interface(&self, interface_id: &str) -> Result<ObjectRef, ForeignError> {
        let class = self.class()?;
        let supported = [IID_IUNKNOWN, IID_IDISPATCH]
            .into_iter()
            .chain(class.interfaces.iter().map(String::as_str))
            .any(|iid| iid.eq_ignore_ascii_case(interface_id));

        if !supported {
            return Err(ForeignError::NoInterface(interface_id.to_string()));
        }

        Ok(Box::new(MemoryObject::new(
            Rc::clone(&self.instance),
            Some(interface_id.to_string()),
            &self.shared,
        )))
    }

    fn class_id(&self) -> Result<String, ForeignError> {
        let class = self.class()?;
        class
            .clsid
            .clone()
            .ok_or_else(|| ForeignError::NoClassId(class.prog_id.clone()))
    }

    fn release(self: Box<Self>) -> Result<(), ForeignError> {
        let fails = self.class().map(|class| class.release_fails).unwrap_or(false);
        let class = self.instance.class.clone();
        drop(self);
        if fails {
            Err(ForeignError::ReleaseFailed(format!("{} refused to release", class)))
        } else {
            Ok(())
        }
    }
}

fn sum(args: &[Value]) -> Result<Value, ForeignError> {
    if args.iter().all(Value::is_i64) {
        let total = args
            .iter()
            .filter_map(Value::as_i64)
            .try_fold(0i64, i64::checked_add)
            .ok_or_else(|| ForeignError::Exception("Arithmetic overflow".to_string()))?;
        return Ok(json!(total));
    }

    let mut total = 0.0;
    for arg in args {
        total += arg
            .as_f64()
            .ok_or_else(|| ForeignError::TypeMismatch(format!("cannot add {}", arg)))?;
    }
    Ok(json!(total))
}
