pub mod shutdown;
pub mod startup;

pub use shutdown::perform_shutdown;
pub use startup::{StartupContext, prepare_server_startup};
