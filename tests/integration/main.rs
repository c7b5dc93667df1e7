//! Integration Tests
//!
//! End-to-end tests through the public `dochost` facade:
//! - Type-preserving round trips for temporal, uuid and uri fields
//! - Idempotent creation and version monotonicity
//! - Concurrent creators and writers
//! - Delete, re-create, patch and history
//! - Operation dispatch and host configuration

#[path = "../common/mod.rs"]
mod common;

mod cloning_times;
mod lifecycle;
mod operations;
