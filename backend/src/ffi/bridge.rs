//! PyO3 wrapper for the tool router
//!
//! Python sees the same tool surface as MCP clients: JSON arguments in,
//! envelope JSON out.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::protocol::{ToolError, ToolRouter};
use crate::runtime::{Catalog, MemoryRuntime};
use crate::Bridge;

/// Python wrapper around a catalog-backed bridge
///
/// # Example (from Python)
///
/// ```python
/// from automation_bridge_core import AutomationBridge
/// import json
///
/// bridge = AutomationBridge(allow_list=["Calc.App"])
/// created = json.loads(bridge.call_tool("CreateObject", '{"identifier": "Calc.App"}'))
/// handle = created["handle"]
/// print(bridge.call_tool("GetProperty", json.dumps({"handle": handle, "property_name": "Caption"})))
/// bridge.shutdown()
/// ```
#[pyclass(unsendable, name = "AutomationBridge")]
pub struct PyAutomationBridge {
    inner: ToolRouter<MemoryRuntime>,
}

#[pymethods]
impl PyAutomationBridge {
    /// Create a bridge over a catalog (the bundled demo catalog by default)
    ///
    /// # Errors
    ///
    /// Raises ValueError if the catalog does not parse or validate.
    #[new]
    #[pyo3(signature = (catalog_json=None, allow_list=None))]
    fn new(catalog_json: Option<&str>, allow_list: Option<Vec<String>>) -> PyResult<Self> {
        let catalog = match catalog_json {
            Some(json) => Catalog::from_json(json),
            None => Catalog::demo(),
        }
        .map_err(|e| PyValueError::new_err(format!("Invalid catalog: {}", e)))?;

        let config = BridgeConfig::default().with_allow_list(allow_list.unwrap_or_default());
        let bridge = Bridge::new(MemoryRuntime::new(catalog), config);
        Ok(Self {
            inner: ToolRouter::new(bridge),
        })
    }

    /// Call a tool; returns the envelope as a JSON string
    ///
    /// # Errors
    ///
    /// Raises ValueError for unknown tools and undecodable arguments.
    fn call_tool(&mut self, name: &str, arguments_json: &str) -> PyResult<String> {
        let arguments: Value = serde_json::from_str(arguments_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid arguments JSON: {}", e)))?;
        let envelope = self.inner.handle_tool_call(name, arguments).map_err(to_py_err)?;
        serde_json::to_string(&envelope).map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Tool definitions as a JSON array
    fn list_tools(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.list_tools())
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Release every live object; returns how many were released
    fn shutdown(&mut self) -> usize {
        self.inner.shutdown().released
    }

    fn __len__(&self) -> usize {
        self.inner.bridge().registry().len()
    }
}

fn to_py_err(err: ToolError) -> PyErr {
    match err {
        ToolError::UnknownTool(_) | ToolError::InvalidParams(_) => PyValueError::new_err(err.to_string()),
        ToolError::Serialization(_) => PyRuntimeError::new_err(err.to_string()),
    }
}
