use std::fmt;

#[derive(Debug, Clone)]
pub enum ShortenerError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    /// 长链接已存在（未删除），携带冲突的长链接
    UniqueViolation(String),
    /// 短 ID 已被占用，携带冲突的短 ID
    ShortIdTaken(String),
    IdExhausted(String),
    Timeout(String),
    QueueFull(String),
    DispatcherClosed(String),
    Identity(String),
}

impl ShortenerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortenerError::DatabaseConfig(_) => "E001",
            ShortenerError::DatabaseConnection(_) => "E002",
            ShortenerError::DatabaseOperation(_) => "E003",
            ShortenerError::FileOperation(_) => "E004",
            ShortenerError::Validation(_) => "E005",
            ShortenerError::NotFound(_) => "E006",
            ShortenerError::Serialization(_) => "E007",
            ShortenerError::UniqueViolation(_) => "E008",
            ShortenerError::ShortIdTaken(_) => "E009",
            ShortenerError::IdExhausted(_) => "E010",
            ShortenerError::Timeout(_) => "E011",
            ShortenerError::QueueFull(_) => "E012",
            ShortenerError::DispatcherClosed(_) => "E013",
            ShortenerError::Identity(_) => "E014",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortenerError::DatabaseConfig(_) => "Database Configuration Error",
            ShortenerError::DatabaseConnection(_) => "Database Connection Error",
            ShortenerError::DatabaseOperation(_) => "Database Operation Error",
            ShortenerError::FileOperation(_) => "File Operation Error",
            ShortenerError::Validation(_) => "Validation Error",
            ShortenerError::NotFound(_) => "Resource Not Found",
            ShortenerError::Serialization(_) => "Serialization Error",
            ShortenerError::UniqueViolation(_) => "Unique Violation",
            ShortenerError::ShortIdTaken(_) => "Short ID Taken",
            ShortenerError::IdExhausted(_) => "Identifier Exhausted",
            ShortenerError::Timeout(_) => "Operation Timeout",
            ShortenerError::QueueFull(_) => "Delete Queue Full",
            ShortenerError::DispatcherClosed(_) => "Delete Dispatcher Closed",
            ShortenerError::Identity(_) => "Identity Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortenerError::DatabaseConfig(msg)
            | ShortenerError::DatabaseConnection(msg)
            | ShortenerError::DatabaseOperation(msg)
            | ShortenerError::FileOperation(msg)
            | ShortenerError::Validation(msg)
            | ShortenerError::NotFound(msg)
            | ShortenerError::Serialization(msg)
            | ShortenerError::UniqueViolation(msg)
            | ShortenerError::ShortIdTaken(msg)
            | ShortenerError::IdExhausted(msg)
            | ShortenerError::Timeout(msg)
            | ShortenerError::QueueFull(msg)
            | ShortenerError::DispatcherClosed(msg)
            | ShortenerError::Identity(msg) => msg,
        }
    }

    /// 是否属于系统性故障（后端整体不可用），而非单条数据的问题
    ///
    /// 删除调度器据此决定是否向上报告故障。
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            ShortenerError::DatabaseConnection(_)
                | ShortenerError::Timeout(_)
                | ShortenerError::FileOperation(_)
        )
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            ShortenerError::Validation(_) | ShortenerError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            ShortenerError::NotFound(_) => StatusCode::NOT_FOUND,
            ShortenerError::UniqueViolation(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于启动失败时打印到终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortenerError {}

// 便捷的构造函数
impl ShortenerError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortenerError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Serialization(msg.into())
    }

    pub fn unique_violation<T: Into<String>>(long_url: T) -> Self {
        ShortenerError::UniqueViolation(long_url.into())
    }

    pub fn short_id_taken<T: Into<String>>(short_id: T) -> Self {
        ShortenerError::ShortIdTaken(short_id.into())
    }

    pub fn id_exhausted<T: Into<String>>(msg: T) -> Self {
        ShortenerError::IdExhausted(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Timeout(msg.into())
    }

    pub fn queue_full<T: Into<String>>(msg: T) -> Self {
        ShortenerError::QueueFull(msg.into())
    }

    pub fn dispatcher_closed<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DispatcherClosed(msg.into())
    }

    pub fn identity<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Identity(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortenerError {
    fn from(err: sea_orm::DbErr) -> Self {
        use sea_orm::DbErr;

        match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => {
                ShortenerError::DatabaseConnection(err.to_string())
            }
            _ => ShortenerError::DatabaseOperation(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ShortenerError {
    fn from(err: std::io::Error) -> Self {
        ShortenerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ShortenerError {
    fn from(err: serde_json::Error) -> Self {
        ShortenerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = vec![
            ShortenerError::database_config("x"),
            ShortenerError::database_connection("x"),
            ShortenerError::database_operation("x"),
            ShortenerError::file_operation("x"),
            ShortenerError::validation("x"),
            ShortenerError::not_found("x"),
            ShortenerError::serialization("x"),
            ShortenerError::unique_violation("x"),
            ShortenerError::short_id_taken("x"),
            ShortenerError::id_exhausted("x"),
            ShortenerError::timeout("x"),
            ShortenerError::queue_full("x"),
            ShortenerError::dispatcher_closed("x"),
            ShortenerError::identity("x"),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_systemic_classification() {
        assert!(ShortenerError::database_connection("gone").is_systemic());
        assert!(ShortenerError::timeout("slow").is_systemic());
        assert!(ShortenerError::file_operation("disk full").is_systemic());
        assert!(!ShortenerError::validation("bad id").is_systemic());
        assert!(!ShortenerError::database_operation("constraint").is_systemic());
    }

    #[test]
    fn test_http_status_mapping() {
        use actix_web::http::StatusCode;

        assert_eq!(
            ShortenerError::validation("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ShortenerError::not_found("x").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ShortenerError::unique_violation("x").http_status(),
            StatusCode::CONFLICT
        );
        for err in [
            ShortenerError::timeout("x"),
            ShortenerError::queue_full("x"),
            ShortenerError::dispatcher_closed("x"),
            ShortenerError::id_exhausted("x"),
            ShortenerError::database_connection("x"),
        ] {
            assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = ShortenerError::not_found("abc");
        assert_eq!(err.to_string(), "Resource Not Found: abc");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ShortenerError = io.into();
        assert!(matches!(err, ShortenerError::FileOperation(_)));
    }
}
