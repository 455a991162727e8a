//! Result envelopes
//!
//! Every facade operation answers with `{result, message, <payload fields>}`.
//! The payload type decides which extra fields appear; on failure the payload
//! is its `Default`, so handle/value fields serialize as `null`.
//!
//! # Critical Invariants
//!
//! 1. `message` always starts with the description of `result`
//! 2. A failure code never carries a usable payload (batch disposal excepted,
//!    see [`Envelope::partial`])

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::core::ResultCode;
use crate::models::handle::Handle;
use crate::models::type_info::TypeDescription;

/// Uniform response shape of every facade operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Outcome code (serialized as its numeric value)
    pub result: ResultCode,

    /// `"<description>: <detail>"`
    pub message: String,

    /// Operation-specific fields
    #[serde(flatten)]
    pub payload: P,
}

impl<P> Envelope<P> {
    /// Successful outcome carrying a payload
    pub fn success(detail: impl fmt::Display, payload: P) -> Self {
        Self {
            result: ResultCode::Success,
            message: ResultCode::Success.message(detail),
            payload,
        }
    }

    /// Outcome whose payload is kept regardless of the code
    ///
    /// Only batch operations use this: their per-item details must survive an
    /// aggregate failure.
    pub fn partial(code: ResultCode, detail: impl fmt::Display, payload: P) -> Self {
        Self {
            result: code,
            message: code.message(detail),
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

impl<P: Default> Envelope<P> {
    /// Failed outcome with an empty payload
    pub fn failure(code: ResultCode, detail: impl fmt::Display) -> Self {
        Self {
            result: code,
            message: code.message(detail),
            payload: P::default(),
        }
    }
}

/// Payload of operations that issue a handle (Create, QueryInterface)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlePayload {
    pub handle: Option<Handle>,
}

/// Payload of `GetTypeInformation`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeInfoPayload {
    pub type_info: Option<TypeDescription>,
}

/// Payload of `InvokeMethod`: a plain value, or a handle string when wrapped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnPayload {
    pub return_value: Value,
}

/// Payload of `GetProperty`: a plain value, or a handle string when wrapped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuePayload {
    pub value: Value,
}

/// Operations that report only a code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoPayload {}

/// One entry of a registry listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub handle: Handle,
    pub type_name: String,
    pub type_identity: String,
}

/// Payload of `ListActiveComObjects`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectsPayload {
    pub objects: Vec<ObjectSummary>,
}

/// Outcome for one item of a disposal batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposeDetail {
    /// The caller's input, verbatim
    pub handle: String,
    pub result: ResultCode,
    pub message: String,
}

/// Payload of `DisposeObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisposePayload {
    pub details: Vec<DisposeDetail>,
}

pub type HandleResponse = Envelope<HandlePayload>;
pub type TypeInfoResponse = Envelope<TypeInfoPayload>;
pub type InvokeResponse = Envelope<ReturnPayload>;
pub type PropertyResponse = Envelope<ValuePayload>;
pub type StatusResponse = Envelope<NoPayload>;
pub type DisposeResponse = Envelope<DisposePayload>;
pub type ListResponse = Envelope<ObjectsPayload>;
