//! Downstream service clients used by remote saga steps.

pub mod http;
pub mod remote;

pub use http::{DEFAULT_REMOTE_TIMEOUT, HttpRemoteService};
pub use remote::{InMemoryRemoteService, RemoteFieldService, RemoteUpdateRequest};
