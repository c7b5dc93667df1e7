//! Runtime for dochost
//!
//! - `instance`: single-writer service instance per document link
//! - `factory`: link -> instance mapping and idempotent creation
//! - `host`: factory registry and operation dispatch
//! - `config`: `dochost.toml` settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod factory;
pub mod host;
pub mod instance;

pub use config::{FactoryConfig, HostConfig, CONFIG_FILE_NAME};
pub use factory::{CreateOutcome, Factory};
pub use host::{Operation, OperationResult, ServiceHost};
pub use instance::{Disposition, InstanceLimits, InstanceStage, ServiceInstance};
