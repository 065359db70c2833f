//! Shared types used across the user store, saga, and API crates.

pub mod types;

pub use types::SubjectId;
