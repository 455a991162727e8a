//! Caller-visible object handles
//!
//! A handle is a random 128-bit identifier rendered as a canonical UUID
//! string. Callers only ever see handles; native references stay inside the
//! registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque token naming one live registry entry
///
/// # Example
/// ```
/// use automation_bridge_core::Handle;
///
/// let handle = Handle::generate();
/// let parsed: Handle = handle.to_string().parse().unwrap();
/// assert_eq!(parsed, handle);
///
/// assert!("not-a-handle".parse::<Handle>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(Uuid);

impl Handle {
    /// Draw a fresh random (v4) handle
    pub fn generate() -> Self {
        Handle(Uuid::new_v4())
    }

    /// Parse caller input, returning `None` for anything but the exact
    /// issued rendering (hyphenated lowercase, no braces or padding)
    pub fn parse(input: &str) -> Option<Self> {
        let handle: Handle = input.parse().ok()?;
        (handle.to_string() == input).then_some(handle)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Handle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Handle)
    }
}

impl From<Uuid> for Handle {
    fn from(uuid: Uuid) -> Self {
        Handle(uuid)
    }
}
