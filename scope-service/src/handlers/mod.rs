//! HTTP handlers for scope-service.

pub mod courses;
pub mod disciplines;
pub mod metrics;
pub mod pagination;
pub mod scope;
pub mod students;
pub mod units;

pub use pagination::{ListQuery, ListResponse};
