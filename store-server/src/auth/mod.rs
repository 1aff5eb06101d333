//! Authentication: JWT issuing/validation, request middleware and rate limits

pub mod jwt;
pub mod middleware;
pub mod rate_limit;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_auth, require_staff};
pub use rate_limit::RateLimiter;
