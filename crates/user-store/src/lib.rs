//! User record storage for the authentication service.
//!
//! The saga's local step reads and writes usernames through the
//! [`UserRepository`] trait. Two implementations are provided: an
//! in-memory store for tests and local runs, and a PostgreSQL store.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod user;

pub use common::SubjectId;
pub use error::{Result, UserStoreError};
pub use memory::InMemoryUserRepository;
pub use postgres::PostgresUserRepository;
pub use repository::UserRepository;
pub use user::{NewUser, User};
