//! Dispatch facade over a foreign automation runtime
//!
//! - **engine**: the [`Bridge`] operations (create, query, describe, invoke,
//!   get/set, dispose, list)
//! - **describe**: best-effort member introspection

pub mod describe;
pub mod engine;

pub use describe::describe_object;
pub use engine::{Bridge, DisposeTarget};
