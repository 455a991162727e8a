//! Dispatch facade
//!
//! Composes the registry, classifier and identity resolver into the
//! caller-facing operations. Every operation:
//!
//! 1. resolves the caller's handle (unknown, malformed and disposed handles
//!    all answer `E_INVALIDARG`, indistinguishably)
//! 2. makes exactly the foreign calls it needs, catching every failure at the
//!    point of call
//! 3. answers with an [`Envelope`]; nothing foreign escapes
//!
//! # Concurrency
//!
//! Mutating operations take `&mut self`, so one bridge processes one request
//! at a time. Foreign calls have no timeout: a hang inside the runtime blocks
//! the caller.
//!
//! # Example
//!
//! ```rust
//! use automation_bridge_core::{Bridge, BridgeConfig, ResultCode};
//! use automation_bridge_core::runtime::MemoryRuntime;
//! use serde_json::json;
//!
//! let mut bridge = Bridge::new(MemoryRuntime::demo().unwrap(), BridgeConfig::default());
//!
//! let created = bridge.create_object("Calc.App");
//! let handle = created.payload.handle.unwrap().to_string();
//!
//! let visible = bridge.get_property(&handle, "Visible");
//! assert_eq!(visible.result, ResultCode::Success);
//! assert_eq!(visible.payload.value, json!(false));
//!
//! bridge.dispose(handle.as_str().into());
//! assert_eq!(bridge.get_property(&handle, "Visible").result, ResultCode::InvalidArgument);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::describe::describe_object;
use crate::classifier::{classify, Classification};
use crate::config::{AllowList, BridgeConfig};
use crate::core::ResultCode;
use crate::identity::{resolve_identifier, resolve_object};
use crate::models::{
    DisposeDetail, DisposePayload, DisposeResponse, Envelope, Handle, HandlePayload, HandleResponse,
    InvokeResponse, ListResponse, NoPayload, ObjectsPayload, PropertyResponse, ReturnPayload,
    StatusResponse, TypeInfoPayload, TypeInfoResponse, ValuePayload,
};
use crate::registry::{DisposeError, HandleRegistry, RegistryEntry, ShutdownReport};
use crate::runtime::{AutomationRuntime, ForeignValue, Member, ObjectRef};

/// Input of a disposal: one handle or an ordered list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisposeTarget {
    One(String),
    Many(Vec<String>),
}

impl DisposeTarget {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            DisposeTarget::One(handle) => vec![handle],
            DisposeTarget::Many(handles) => handles,
        }
    }
}

impl From<&str> for DisposeTarget {
    fn from(handle: &str) -> Self {
        DisposeTarget::One(handle.to_string())
    }
}

impl From<String> for DisposeTarget {
    fn from(handle: String) -> Self {
        DisposeTarget::One(handle)
    }
}

impl From<Vec<String>> for DisposeTarget {
    fn from(handles: Vec<String>) -> Self {
        DisposeTarget::Many(handles)
    }
}

/// A classified return value after registration
enum Adopted {
    Handle(Handle),
    Value(Value),
}

/// The facade over one runtime and one registry
pub struct Bridge<R> {
    runtime: R,
    registry: HandleRegistry,
    allow_list: AllowList,
    config: BridgeConfig,
}

impl<R: AutomationRuntime> Bridge<R> {
    pub fn new(runtime: R, config: BridgeConfig) -> Self {
        Self {
            runtime,
            registry: HandleRegistry::new(),
            allow_list: AllowList::from(&config),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Instantiate a foreign object by symbolic name or class id
    pub fn create_object(&mut self, identifier: &str) -> HandleResponse {
        if !self.allow_list.is_allowed(identifier) {
            warn!(identifier, "creation rejected by allow-list");
            return Envelope::failure(
                ResultCode::AccessDenied,
                format!("{} is not on the ALLOWLIST", identifier),
            );
        }

        let object = match self.runtime.create_instance(identifier) {
            Ok(object) => object,
            Err(e) => {
                return Envelope::failure(
                    ResultCode::UnspecifiedFailure,
                    format!("Failed to create COM object: {}", e),
                )
            }
        };

        let identity = resolve_identifier(&self.runtime, identifier);
        let handle = self.registry.insert(object, identity);
        info!(identifier, handle = %handle, "created object");

        Envelope::success(
            format!("Successfully created COM object: {}", identifier),
            HandlePayload {
                handle: Some(handle),
            },
        )
    }

    /// Reinterpret a live object as another interface, under a new handle
    pub fn query_interface(&mut self, handle: &str, interface_id: &str) -> HandleResponse {
        let queried = match self.entry(handle) {
            Ok(entry) => entry.object().query_interface(interface_id),
            Err(response) => return response,
        };

        match queried {
            Ok(interface) => {
                let new_handle = self.register(interface);
                info!(source = handle, handle = %new_handle, interface_id, "queried interface");
                Envelope::success(
                    format!(
                        "Successfully queried interface: {}. New handle: {}",
                        interface_id, new_handle
                    ),
                    HandlePayload {
                        handle: Some(new_handle),
                    },
                )
            }
            Err(e) => Envelope::failure(
                ResultCode::NoInterface,
                format!("Interface not supported: {}", e),
            ),
        }
    }

    /// Best-effort description of an object's members
    pub fn describe(&self, handle: &str) -> TypeInfoResponse {
        let entry = match self.entry(handle) {
            Ok(entry) => entry,
            Err(response) => return response,
        };

        match describe_object(entry.object()) {
            Ok(type_info) => Envelope::success(
                "Successfully retrieved type information",
                TypeInfoPayload {
                    type_info: Some(type_info),
                },
            ),
            Err(e) => Envelope::failure(
                ResultCode::UnspecifiedFailure,
                format!("Failed to get type information: {}", e),
            ),
        }
    }

    /// Call a method; object results are registered under a new handle
    ///
    /// `args: None` is sent as an empty argument list.
    pub fn invoke_method(
        &mut self,
        handle: &str,
        method_name: &str,
        args: Option<Vec<Value>>,
    ) -> InvokeResponse {
        let returned = {
            let entry = match self.entry(handle) {
                Ok(entry) => entry,
                Err(response) => return response,
            };
            let object = entry.object();

            match object.enumerate_members() {
                Ok(members) if members.iter().any(|m| m == method_name) => {}
                Ok(_) => {
                    return Envelope::failure(
                        ResultCode::MemberNotFound,
                        format!("Method not found: {}", method_name),
                    )
                }
                Err(e) => {
                    return Envelope::failure(
                        ResultCode::UnspecifiedFailure,
                        format!(
                            "An unexpected error occurred while invoking method '{}': {}",
                            method_name, e
                        ),
                    )
                }
            }

            // A member that is discoverably a property is not callable; one
            // that cannot be inspected is still attempted.
            if let Ok(Member::Property(_)) = object.inspect_member(method_name) {
                return Envelope::failure(
                    ResultCode::MemberNotFound,
                    format!("Member is not a method: {}", method_name),
                );
            }

            let args = args.unwrap_or_default();
            debug!(handle, method_name, argc = args.len(), "invoking method");
            object.invoke_member(method_name, &args)
        };

        match returned {
            Ok(value) => match self.adopt(value) {
                Adopted::Handle(new_handle) => Envelope::success(
                    format!(
                        "Successfully invoked method: {} and registered return value as COM object. Reference it with handle: {}",
                        method_name, new_handle
                    ),
                    ReturnPayload {
                        return_value: Value::String(new_handle.to_string()),
                    },
                ),
                Adopted::Value(return_value) => Envelope::success(
                    format!("Successfully invoked method: {}", method_name),
                    ReturnPayload { return_value },
                ),
            },
            Err(e) => Envelope::failure(
                ResultCode::UnspecifiedFailure,
                format!("Failed to invoke method '{}': {}", method_name, e),
            ),
        }
    }

    /// Read a property; object values are registered under a new handle
    pub fn get_property(&mut self, handle: &str, property_name: &str) -> PropertyResponse {
        let read = {
            let entry = match self.entry(handle) {
                Ok(entry) => entry,
                Err(response) => return response,
            };
            if let Err(response) = check_member(entry, property_name, "getting") {
                return response;
            }
            entry.object().get_member(property_name)
        };

        match read {
            Ok(value) => match self.adopt(value) {
                Adopted::Handle(new_handle) => Envelope::success(
                    format!(
                        "Successfully got property: {} and registered COM object. Reference it with handle: {}",
                        property_name, new_handle
                    ),
                    ValuePayload {
                        value: Value::String(new_handle.to_string()),
                    },
                ),
                Adopted::Value(value) => Envelope::success(
                    format!("Successfully got property: {}", property_name),
                    ValuePayload { value },
                ),
            },
            Err(e) => Envelope::failure(
                ResultCode::UnspecifiedFailure,
                format!("Failed to get property '{}': {}", property_name, e),
            ),
        }
    }

    /// Write a property
    pub fn set_property(&mut self, handle: &str, property_name: &str, value: Value) -> StatusResponse {
        let entry = match self.entry(handle) {
            Ok(entry) => entry,
            Err(response) => return response,
        };
        if let Err(response) = check_member(entry, property_name, "setting") {
            return response;
        }

        match entry.object().set_member(property_name, value) {
            Ok(()) => Envelope::success(
                format!("Successfully set property: {}", property_name),
                NoPayload {},
            ),
            Err(e) => Envelope::failure(
                ResultCode::UnspecifiedFailure,
                format!("Failed to set property '{}': {}", property_name, e),
            ),
        }
    }

    /// Dispose one or many handles, reporting each independently
    pub fn dispose(&mut self, target: DisposeTarget) -> DisposeResponse {
        let inputs = target.into_vec();
        let parsed: Vec<Option<Handle>> = inputs.iter().map(|input| Handle::parse(input)).collect();
        let valid: Vec<Handle> = parsed.iter().flatten().copied().collect();
        let mut outcomes = self.registry.dispose_many(&valid).outcomes.into_iter();

        let details: Vec<DisposeDetail> = inputs
            .iter()
            .zip(parsed)
            .map(|(input, parsed)| {
                let outcome = parsed.and_then(|_| outcomes.next()).map(|(_, outcome)| outcome);
                match outcome {
                    Some(Ok(())) => detail(input, ResultCode::Success, "Successfully disposed object"),
                    Some(Err(e @ DisposeError::ReleaseFailed(_))) => {
                        detail(input, ResultCode::UnspecifiedFailure, e)
                    }
                    Some(Err(DisposeError::NotFound(_))) | None => detail(
                        input,
                        ResultCode::InvalidArgument,
                        format!("Invalid object ID: {}", input),
                    ),
                }
            })
            .collect();

        let code = if details.iter().all(|d| d.result.is_success()) {
            ResultCode::Success
        } else {
            ResultCode::UnspecifiedFailure
        };

        Envelope::partial(
            code,
            format!("Processed {} object(s)", inputs.len()),
            DisposePayload { details },
        )
    }

    /// Snapshot of every live object
    pub fn list_objects(&self) -> ListResponse {
        let objects = self.registry.list();
        Envelope::success(
            format!("Found {} active COM objects", objects.len()),
            ObjectsPayload { objects },
        )
    }

    /// Release every live object
    pub fn shutdown(&mut self) -> ShutdownReport {
        self.registry.shutdown()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn entry<P: Default>(&self, handle: &str) -> Result<&RegistryEntry, Envelope<P>> {
        Handle::parse(handle)
            .and_then(|parsed| self.registry.lookup(&parsed))
            .ok_or_else(|| {
                Envelope::failure(
                    ResultCode::InvalidArgument,
                    format!("Invalid object ID: {}", handle),
                )
            })
    }

    fn register(&mut self, object: ObjectRef) -> Handle {
        let identity = resolve_object(&self.runtime, object.as_ref());
        self.registry.insert(object, identity)
    }

    fn adopt(&mut self, value: ForeignValue) -> Adopted {
        match classify(value) {
            Classification::Wrap(object) => Adopted::Handle(self.register(object)),
            Classification::PassThrough(value) => Adopted::Value(value),
        }
    }
}

/// Property operations require a discoverable member that is not a method
fn check_member<P: Default>(entry: &RegistryEntry, name: &str, action: &str) -> Result<(), Envelope<P>> {
    let object = entry.object();
    match object.enumerate_members() {
        Ok(members) if members.iter().any(|m| m == name) => {}
        Ok(_) => {
            return Err(Envelope::failure(
                ResultCode::MemberNotFound,
                format!("Property not found: {}", name),
            ))
        }
        Err(e) => {
            return Err(Envelope::failure(
                ResultCode::UnspecifiedFailure,
                format!(
                    "An unexpected error occurred while {} property '{}': {}",
                    action, name, e
                ),
            ))
        }
    }

    // Same rule as invoke, mirrored: an uninspectable member is still attempted.
    match object.inspect_member(name) {
        Ok(Member::Method { .. }) => Err(Envelope::failure(
            ResultCode::MemberNotFound,
            format!("Member is not a property: {}", name),
        )),
        _ => Ok(()),
    }
}

fn detail(input: &str, code: ResultCode, text: impl std::fmt::Display) -> DisposeDetail {
    DisposeDetail {
        handle: input.to_string(),
        result: code,
        message: code.message(text),
    }
}
