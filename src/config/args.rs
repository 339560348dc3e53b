//! Command-line arguments
//!
//! 兼容旧部署方式的命令行参数与环境变量（`-a`/`SERVER_ADDRESS` 等），
//! 优先级高于 TOML 与 `SHORTENER__*` 环境变量。

use clap::Parser;

use super::StaticConfig;

/// Shortener - URL shortener service
#[derive(Parser, Debug, Default)]
#[command(name = "shortener")]
#[command(version)]
#[command(about = "A URL shortener service", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Address to listen on (host:port or :port)
    #[arg(short = 'a', long = "address", env = "SERVER_ADDRESS")]
    pub server_address: Option<String>,

    /// Public base URL used to build short links
    #[arg(short = 'b', long = "base-url", env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Journal file for the file-backed storage
    #[arg(short = 'f', long = "file-storage-path", env = "FILE_STORAGE_PATH")]
    pub file_storage_path: Option<String>,

    /// Database connection string; selects the relational storage when set
    #[arg(short = 'd', long = "database-dsn", env = "DATABASE_DSN")]
    pub database_dsn: Option<String>,

    /// Storage operation timeout in seconds
    #[arg(short = 't', long = "ctx-timeout", env = "CTX_TIMEOUT")]
    pub ctx_timeout: Option<u64>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub generate_config: bool,
}

impl Cli {
    /// 将命令行/旧环境变量覆盖到已加载的配置上
    pub fn apply(&self, config: &mut StaticConfig) -> Result<(), String> {
        if let Some(ref address) = self.server_address {
            let (host, port) = parse_server_address(address)?;
            config.server.host = host;
            config.server.port = port;
        }
        if let Some(ref base_url) = self.base_url {
            config.server.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(ref path) = self.file_storage_path {
            config.storage.file_path = path.clone();
        }
        if let Some(ref dsn) = self.database_dsn {
            config.storage.database_url = dsn.clone();
        }
        if let Some(timeout) = self.ctx_timeout {
            if timeout == 0 {
                return Err("ctx timeout must be greater than zero".to_string());
            }
            config.server.request_timeout_secs = timeout;
        }
        Ok(())
    }
}

/// 解析监听地址
///
/// 支持 `host:port` 与 `:port`（监听所有网卡）。
pub fn parse_server_address(address: &str) -> Result<(String, u16), String> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| format!("Invalid server address '{}': expected host:port", address))?;

    let port: u16 = port
        .parse()
        .map_err(|_| format!("Invalid port in server address '{}'", address))?;

    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok((host.to_string(), port))
}
