//! Well-known factory links

/// User group factory
pub const CORE_AUTHZ_USER_GROUPS: &str = "/core/authz/user-groups";

/// User factory
pub const CORE_AUTHZ_USERS: &str = "/core/authz/users";
