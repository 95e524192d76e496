pub mod auth;
pub mod rate_limit;

pub use auth::{issue_token, AuthUser, Claims};
pub use rate_limit::rate_limit_middleware;
