//! Infrastructure layer: storage adapters behind the `registrar-auth` traits.
//!
//! - `credentials`: refresh-token persistence (in-memory, Postgres)
//! - `identity`: accounts, roles and profile links
//! - `password`: Argon2 hashing used by the account store

pub mod credentials;
pub mod identity;
pub mod password;

mod integration_tests;

pub use credentials::InMemoryCredentialStore;
#[cfg(feature = "postgres")]
pub use credentials::PostgresCredentialStore;
pub use identity::{InMemoryIdentityStore, LockoutPolicy};
