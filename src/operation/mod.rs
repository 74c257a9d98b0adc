//! Data-driven operation invocation
//!
//! An operation is described once in the catalog; binding, confirmation,
//! pagination and output selection are shared by all of them.

pub mod error;
pub mod history;
pub mod invoker;
pub mod path_extractor;
pub mod protocol;
pub mod registry;
pub mod request;
pub mod response;
pub mod selector;

pub use error::{InvokeError, RemoteError, TransportKind, UsageError};
pub use history::{HistoryEntry, ResultLog};
pub use invoker::{
    Confirm, ConfirmPrompt, DenyAll, InvocationSummary, InvokeOptions, InvokePolicy, Invoker,
    MissingFieldPolicy, PaginationState, RemoteCall,
};
pub use protocol::{ApiProtocol, ConfirmImpact, FieldSpec, FieldType, OperationDescriptor};
pub use registry::{load_catalog, OperationCatalog};
pub use request::OperationRequest;
pub use response::OperationResponse;
pub use selector::OutputSelector;
