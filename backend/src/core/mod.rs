//! Core vocabulary shared by every layer of the bridge

pub mod result;

pub use result::{describe_code, ResultCode, UnknownResultCode};
