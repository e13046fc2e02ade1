//! Services layer for scope-service.
//!
//! Scope resolution and enforcement, plus the directory backends they read.

mod database;
pub mod directory;
pub mod enforcer;
pub mod error;
pub mod filter;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
pub mod permissions;
pub mod resolver;

pub use database::Database;
pub use directory::{Directory, Page, RecordStore};
pub use enforcer::AccessEnforcer;
pub use error::{AccessError, ForbiddenReason};
pub use filter::ScopeFilter;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryDirectory;
pub use permissions::PermissionTable;
pub use resolver::ScopeResolver;
