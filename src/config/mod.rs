//! 配置管理
//!
//! 启动时加载一次的静态配置（TOML + 环境变量 + 命令行），由 `main` 显式传递，
//! 不使用全局单例。

pub mod args;
mod structs;

pub use args::{Cli, parse_server_address};
pub use structs::*;
