//! Result vocabulary
//!
//! The closed set of outcome codes every bridge operation reports. Codes use
//! the host platform's HRESULT numbering so callers familiar with the object
//! model can reason about them directly.
//!
//! Every envelope message is built as `"<description>: <detail>"`, so the
//! description of the code is always visible to the caller even when it only
//! reads the message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Outcome code returned by every facade operation
///
/// # Example
/// ```
/// use automation_bridge_core::ResultCode;
///
/// let code = ResultCode::MemberNotFound;
/// assert_eq!(code.value(), 0x8002_0003);
/// assert!(!code.is_success());
/// assert_eq!(
///     code.message("Method not found: Quit"),
///     "DISP_E_MEMBERNOTFOUND (0x80020003) - Member not found: Method not found: Quit"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum ResultCode {
    /// S_OK
    Success,

    /// S_FALSE
    SuccessFalse,

    /// E_FAIL
    UnspecifiedFailure,

    /// E_NOINTERFACE
    NoInterface,

    /// E_INVALIDARG
    InvalidArgument,

    /// E_ACCESSDENIED
    AccessDenied,

    /// DISP_E_MEMBERNOTFOUND
    MemberNotFound,
}

/// Raised when a numeric code is outside the vocabulary
#[derive(Debug, Error, PartialEq)]
#[error("Unknown result: {0:#010x}")]
pub struct UnknownResultCode(pub u32);

impl ResultCode {
    /// All codes in the vocabulary
    pub const ALL: [ResultCode; 7] = [
        ResultCode::Success,
        ResultCode::SuccessFalse,
        ResultCode::UnspecifiedFailure,
        ResultCode::NoInterface,
        ResultCode::InvalidArgument,
        ResultCode::AccessDenied,
        ResultCode::MemberNotFound,
    ];

    /// Numeric HRESULT value
    pub const fn value(self) -> u32 {
        match self {
            ResultCode::Success => 0x0000_0000,
            ResultCode::SuccessFalse => 0x0000_0001,
            ResultCode::UnspecifiedFailure => 0x8000_4005,
            ResultCode::NoInterface => 0x8000_4002,
            ResultCode::InvalidArgument => 0x8007_0057,
            ResultCode::AccessDenied => 0x8007_0005,
            ResultCode::MemberNotFound => 0x8002_0003,
        }
    }

    /// Stable human-readable description
    pub const fn description(self) -> &'static str {
        match self {
            ResultCode::Success => "S_OK (0x00000000) - Operation successful",
            ResultCode::SuccessFalse => "S_FALSE (0x00000001) - Successful but false condition",
            ResultCode::UnspecifiedFailure => "E_FAIL (0x80004005) - Unspecified failure",
            ResultCode::NoInterface => "E_NOINTERFACE (0x80004002) - Interface not supported",
            ResultCode::InvalidArgument => {
                "E_INVALIDARG (0x80070057) - One or more arguments are invalid"
            }
            ResultCode::AccessDenied => "E_ACCESSDENIED (0x80070005) - Access denied",
            ResultCode::MemberNotFound => "DISP_E_MEMBERNOTFOUND (0x80020003) - Member not found",
        }
    }

    /// True for S_OK and S_FALSE (severity bit clear)
    pub const fn is_success(self) -> bool {
        self.value() & 0x8000_0000 == 0
    }

    /// Build an envelope message: description followed by the detail clause
    pub fn message(self, detail: impl fmt::Display) -> String {
        format!("{}: {}", self.description(), detail)
    }

    /// Look up a code by numeric value
    pub fn from_value(value: u32) -> Option<ResultCode> {
        Self::ALL.into_iter().find(|code| code.value() == value)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<ResultCode> for u32 {
    fn from(code: ResultCode) -> Self {
        code.value()
    }
}

impl TryFrom<u32> for ResultCode {
    type Error = UnknownResultCode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        ResultCode::from_value(value).ok_or(UnknownResultCode(value))
    }
}

/// Describe any numeric code, including ones outside the vocabulary
///
/// # Example
/// ```
/// use automation_bridge_core::core::result::describe_code;
///
/// assert_eq!(describe_code(0), "S_OK (0x00000000) - Operation successful");
/// assert_eq!(describe_code(0x8000_FFFF), "Unknown result: 0x8000ffff");
/// ```
pub fn describe_code(value: u32) -> String {
    match ResultCode::from_value(value) {
        Some(code) => code.description().to_string(),
        None => format!("Unknown result: {:#010x}", value),
    }
}
