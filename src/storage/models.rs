use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 持久化的短链接映射
///
/// 序列化字段名与文件日志格式一致：`{"user_id","id","url","deleted"}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntity {
    pub user_id: String,
    #[serde(rename = "id")]
    pub short_id: String,
    #[serde(rename = "url")]
    pub long_url: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl UrlEntity {
    pub fn new(
        user_id: impl Into<String>,
        short_id: impl Into<String>,
        long_url: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            short_id: short_id.into(),
            long_url: long_url.into(),
            deleted: false,
            created_at: Utc::now(),
        }
    }
}

/// 短 ID 的生成方式，由存储后端声明
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// 固定长度随机字母数字，冲突时重试
    Random,
    /// 调用方生成的全局唯一 UUID
    Uuid,
}
