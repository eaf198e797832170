pub mod auth;
pub mod response;

pub use auth::{session_middleware, AuthUser};
pub use response::{found, ApiResponse, ApiResult};
