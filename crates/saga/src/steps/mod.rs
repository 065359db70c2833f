//! Concrete saga steps.

pub mod local;
pub mod remote;

pub use local::LocalRecordStep;
pub use remote::RemoteMirrorStep;
