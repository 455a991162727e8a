//! Handle registry
//!
//! The single owner of every native reference handed to callers.
//!
//! # Critical Invariants
//!
//! 1. **Exclusive ownership**: entries own their references; other components
//!    only borrow them for the duration of one operation
//! 2. **No reuse**: a handle value is issued at most once per registry, even
//!    after the entry it named has been disposed
//! 3. **Immutability**: an entry never changes after insertion; a different
//!    reference always gets a new handle
//! 4. **Forward progress**: disposal removes the entry even when releasing
//!    the native reference fails; the failure is reported, not retried

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{info, warn};

use crate::identity::TypeIdentity;
use crate::models::{Handle, ObjectSummary};
use crate::runtime::{ForeignObject, ObjectRef};

/// Errors that can occur when disposing an entry
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DisposeError {
    #[error("Invalid object ID: {0}")]
    NotFound(Handle),

    /// The entry is gone; only the native release failed
    #[error("Failed to dispose object: {0}")]
    ReleaseFailed(String),
}

/// A live binding from handle to native reference
#[derive(Debug)]
pub struct RegistryEntry {
    handle: Handle,
    object: ObjectRef,
    identity: TypeIdentity,
}

impl RegistryEntry {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Borrow the native reference for one operation
    pub fn object(&self) -> &dyn ForeignObject {
        self.object.as_ref()
    }

    pub fn identity(&self) -> &TypeIdentity {
        &self.identity
    }

    pub fn type_name(&self) -> &str {
        &self.identity.type_name
    }

    pub fn type_identity(&self) -> &str {
        &self.identity.type_identity
    }

    pub fn summary(&self) -> ObjectSummary {
        ObjectSummary {
            handle: self.handle,
            type_name: self.identity.type_name.clone(),
            type_identity: self.identity.type_identity.clone(),
        }
    }
}

/// Per-item outcomes of a batch disposal, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDisposal {
    pub outcomes: Vec<(Handle, Result<(), DisposeError>)>,
}

impl BatchDisposal {
    /// True only if every element was disposed cleanly
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_ok())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| outcome.is_ok()).count()
    }
}

/// Result of releasing every live entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    /// Entries removed from the registry
    pub released: usize,

    /// Entries whose native release failed (they were removed regardless)
    pub failures: Vec<(Handle, String)>,
}

/// Authoritative handle → reference map
///
/// # Example
/// ```
/// use automation_bridge_core::identity::TypeIdentity;
/// use automation_bridge_core::registry::HandleRegistry;
/// use automation_bridge_core::runtime::{AutomationRuntime, MemoryRuntime};
///
/// let runtime = MemoryRuntime::demo().unwrap();
/// let mut registry = HandleRegistry::new();
///
/// let object = runtime.create_instance("Calc.App").unwrap();
/// let handle = registry.insert(object, TypeIdentity::unknown());
/// assert!(registry.contains(&handle));
///
/// registry.dispose(&handle).unwrap();
/// assert!(registry.is_empty());
/// assert_eq!(runtime.live_references(), 0);
/// ```
#[derive(Debug, Default)]
pub struct HandleRegistry {
    entries: HashMap<Handle, RegistryEntry>,

    /// Every handle ever issued, live or disposed. Never pruned: grows by
    /// one entry per issued handle for the life of the registry.
    issued: HashSet<Handle>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `object` and issue a fresh handle for it
    pub fn insert(&mut self, object: ObjectRef, identity: TypeIdentity) -> Handle {
        let handle = self.fresh_handle();
        self.entries.insert(
            handle,
            RegistryEntry {
                handle,
                object,
                identity,
            },
        );
        handle
    }

    fn fresh_handle(&mut self) -> Handle {
        loop {
            let candidate = Handle::generate();
            if self.issued.insert(candidate) {
                return candidate;
            }
        }
    }

    pub fn lookup(&self, handle: &Handle) -> Option<&RegistryEntry> {
        self.entries.get(handle)
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.entries.contains_key(handle)
    }

    /// Whether `handle` was ever issued by this registry
    pub fn was_issued(&self, handle: &Handle) -> bool {
        self.issued.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove an entry and release its reference
    pub fn dispose(&mut self, handle: &Handle) -> Result<(), DisposeError> {
        let entry = self
            .entries
            .remove(handle)
            .ok_or(DisposeError::NotFound(*handle))?;

        match entry.object.release() {
            Ok(()) => {
                info!(handle = %handle, type_name = %entry.identity.type_name, "disposed object");
                Ok(())
            }
            Err(e) => {
                warn!(handle = %handle, error = %e, "release failed; entry removed anyway");
                Err(DisposeError::ReleaseFailed(e.to_string()))
            }
        }
    }

    /// Dispose each handle independently, preserving input order
    pub fn dispose_many(&mut self, handles: &[Handle]) -> BatchDisposal {
        BatchDisposal {
            outcomes: handles
                .iter()
                .map(|handle| (*handle, self.dispose(handle)))
                .collect(),
        }
    }

    /// Snapshot of live entries, in no particular order
    pub fn list(&self) -> Vec<ObjectSummary> {
        self.entries.values().map(RegistryEntry::summary).collect()
    }

    /// Release every live entry, leaving the registry empty
    pub fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        for (handle, entry) in self.entries.drain() {
            report.released += 1;
            if let Err(e) = entry.object.release() {
                warn!(handle = %handle, error = %e, "release failed during shutdown");
                report.failures.push((handle, e.to_string()));
            }
        }
        if report.released > 0 {
            info!(released = report.released, failed = report.failures.len(), "registry shut down");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{AutomationRuntime, Catalog, MemoryRuntime};

    fn runtime() -> MemoryRuntime {
        MemoryRuntime::new(
            Catalog::from_json(
                r#"{"classes": [
                    {"prog_id": "Good.Object"},
                    {"prog_id": "Sticky.Object", "release_fails": true}
                ]}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_second_dispose_is_not_found() {
        let rt = runtime();
        let mut registry = HandleRegistry::new();
        let handle = registry.insert(rt.create_instance("Good.Object").unwrap(), TypeIdentity::unknown());

        assert_eq!(registry.dispose(&handle), Ok(()));
        assert_eq!(registry.dispose(&handle), Err(DisposeError::NotFound(handle)));
        assert!(registry.was_issued(&handle));
    }

    #[test]
    fn test_release_failure_still_removes_entry() {
        let rt = runtime();
        let mut registry = HandleRegistry::new();
        let handle = registry.insert(rt.create_instance("Sticky.Object").unwrap(), TypeIdentity::unknown());

        assert!(matches!(registry.dispose(&handle), Err(DisposeError::ReleaseFailed(_))));
        assert!(!registry.contains(&handle));
        assert_eq!(rt.live_references(), 0);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let rt = runtime();
        let mut registry = HandleRegistry::new();
        registry.insert(rt.create_instance("Good.Object").unwrap(), TypeIdentity::unknown());
        registry.insert(rt.create_instance("Good.Object").unwrap(), TypeIdentity::unknown());
        let sticky = registry.insert(rt.create_instance("Sticky.Object").unwrap(), TypeIdentity::unknown());

        let report = registry.shutdown();
        assert_eq!(report.released, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, sticky);
        assert!(registry.is_empty());
        assert_eq!(rt.live_references(), 0);
    }

    #[test]
    fn test_dispose_many_preserves_order() {
        let rt = runtime();
        let mut registry = HandleRegistry::new();
        let a = registry.insert(rt.create_instance("Good.Object").unwrap(), TypeIdentity::unknown());
        let missing = Handle::generate();
        let b = registry.insert(rt.create_instance("Good.Object").unwrap(), TypeIdentity::unknown());

        let batch = registry.dispose_many(&[a, missing, b]);
        assert_eq!(batch.outcomes.len(), 3);
        assert_eq!(batch.outcomes[0], (a, Ok(())));
        assert_eq!(batch.outcomes[1], (missing, Err(DisposeError::NotFound(missing))));
        assert_eq!(batch.outcomes[2], (b, Ok(())));
        assert!(!batch.all_succeeded());
        assert_eq!(batch.succeeded(), 2);
        assert!(registry.is_empty());
    }
}
