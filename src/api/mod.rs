//! HTTP 层：路由、处理器、中间件与错误映射

pub mod errors;
pub mod identity;
pub mod middleware;
pub mod services;
pub mod state;

pub use identity::{IdentityService, UserId};
pub use services::configure;
pub use state::AppState;
