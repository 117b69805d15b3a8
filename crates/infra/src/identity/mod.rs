//! Identity stores: user accounts, roles and academic profiles.

pub mod in_memory;

pub use in_memory::{InMemoryIdentityStore, LockoutPolicy};
