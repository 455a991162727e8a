//! Domain models crossing the protocol boundary

pub mod envelope;
pub mod handle;
pub mod type_info;

// Re-exports
pub use envelope::{
    DisposeDetail, DisposePayload, DisposeResponse, Envelope, HandlePayload, HandleResponse,
    InvokeResponse, ListResponse, NoPayload, ObjectSummary, ObjectsPayload, PropertyResponse,
    ReturnPayload, StatusResponse, TypeInfoPayload, TypeInfoResponse, ValuePayload,
};
pub use handle::Handle;
pub use type_info::{MemberError, MethodInfo, PropertyInfo, TypeDescription, UNKNOWN};
