//! Automation Bridge Core
//!
//! Exposes a late-bound object automation runtime to JSON clients through
//! opaque handles.
//!
//! # Architecture
//!
//! - **core**: Result vocabulary (HRESULT-style codes and messages)
//! - **models**: Handles, envelopes and type descriptions
//! - **runtime**: Foreign runtime traits and the catalog-driven memory runtime
//! - **classifier**: Object vs. plain value decision for returned values
//! - **identity**: Best-effort type name / class id resolution
//! - **registry**: Sole owner of native references, keyed by handle
//! - **bridge**: The dispatch facade (create, query, describe, invoke, ...)
//! - **protocol**: MCP tools over line-delimited JSON-RPC
//!
//! # Critical Invariants
//!
//! 1. Native references never cross the protocol boundary; callers see handles
//! 2. Every native reference handed out is owned by exactly one registry entry
//! 3. No foreign failure escapes an operation; each becomes a result code

// Module declarations
pub mod bridge;
pub mod classifier;
pub mod config;
pub mod core;
pub mod identity;
pub mod models;
pub mod protocol;
pub mod registry;
pub mod runtime;

// Re-exports for convenience
pub use bridge::{Bridge, DisposeTarget};
pub use classifier::{classify, Classification};
pub use config::{AllowList, BridgeConfig};
pub use core::{describe_code, ResultCode, UnknownResultCode};
pub use identity::TypeIdentity;
pub use models::{Envelope, Handle, TypeDescription};
pub use protocol::McpServer;
pub use registry::{DisposeError, HandleRegistry, ShutdownReport};
pub use runtime::{AutomationRuntime, ForeignError, ForeignObject, ForeignValue, MemoryRuntime};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn automation_bridge_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::bridge::PyAutomationBridge>()?;
    Ok(())
}
