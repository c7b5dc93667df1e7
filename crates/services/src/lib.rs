//! Built-in services for dochost
//!
//! - `user_group`: groups whose membership is a query over documents
//! - `paths`: well-known factory links

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod paths;
pub mod user_group;

pub use paths::{CORE_AUTHZ_USERS, CORE_AUTHZ_USER_GROUPS};
pub use user_group::{
    start_user_group_factory, GroupResolver, UserGroupState, UserGroupStateBuilder,
};
