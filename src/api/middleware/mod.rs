pub mod identity;
pub mod request_log;

pub use identity::IdentityMiddleware;
pub use request_log::RequestLogMiddleware;
