use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 监听地址、公开 base URL、请求超时、关闭超时
/// - storage: 文件日志路径或数据库连接串、ID 生成参数
/// - dispatcher: 异步删除队列与 worker 池
/// - identity: 用户标识 Cookie 的签名与属性
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > TOML > 默认值
    /// ENV 前缀：SHORTENER，分隔符：__
    /// 示例：SHORTENER__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix("SHORTENER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config = settings.try_deserialize::<StaticConfig>()?;
        config.validate()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        Ok(config)
    }

    /// 校验加载后的取值（与命令行 `-t` 的检查一致）
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 监听地址 `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 拼接短链接使用的公开地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 单次存储操作的超时（秒）
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 关闭时每个阶段的宽限期（秒）
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// 未知或已删除的短链接返回 400 而不是 404
    #[serde(default)]
    pub not_found_as_bad_request: bool,
}

/// 存储后端配置
///
/// `database_url` 非空时使用关系型后端，否则使用文件日志后端。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_file_path")]
    pub file_path: String,
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_id_length")]
    pub id_length: usize,
    #[serde(default = "default_id_attempts")]
    pub id_attempts: u32,
}

/// 异步删除调度器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_dispatcher_workers")]
    pub workers: usize,
    /// 队列总容量，平均分配给各个 worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// 队列满时提交方最多等待的时间（毫秒）
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
    /// 单次合并处理的最大任务数
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
    /// 连续系统性失败达到该次数后上报故障
    #[serde(default = "default_fault_threshold")]
    pub fault_threshold: u32,
}

/// 用户标识 Cookie 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// HS256 签名密钥，为空时每次启动随机生成
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_days")]
    pub cookie_days: u64,
    #[serde(default)]
    pub secure: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_request_timeout_secs() -> u64 {
    3
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_file_path() -> String {
    "./storage.txt".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_id_length() -> usize {
    5
}

fn default_id_attempts() -> u32 {
    10
}

fn default_dispatcher_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_enqueue_timeout_ms() -> u64 {
    100
}

fn default_max_batch() -> usize {
    64
}

fn default_fault_threshold() -> u32 {
    5
}

fn default_cookie_name() -> String {
    "shortener_uid".to_string()
}

fn default_cookie_days() -> u64 {
    365
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            base_url: default_base_url(),
            cpu_count: default_cpu_count(),
            request_timeout_secs: default_request_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            not_found_as_bad_request: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_path: default_file_path(),
            database_url: String::new(),
            pool_size: default_database_pool_size(),
            id_length: default_id_length(),
            id_attempts: default_id_attempts(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_dispatcher_workers(),
            queue_capacity: default_queue_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
            max_batch: default_max_batch(),
            fault_threshold: default_fault_threshold(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: default_cookie_name(),
            cookie_days: default_cookie_days(),
            secure: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
