//! Contract types shared by every document
//!
//! - `version`: per-link mutation counter
//! - `timestamp`: commit time of a version

pub mod timestamp;
pub mod version;

pub use timestamp::Timestamp;
pub use version::Version;
