//! 存储层
//!
//! `UrlStorage` 是两种后端（文件日志 / 关系型数据库）的统一能力接口，
//! 启动时由 `StorageFactory` 根据配置选择，调用方只持有 `Arc<dyn UrlStorage>`。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::Result;

pub mod backend;
pub mod file;
pub mod models;

pub use backend::SeaOrmStorage;
pub use file::FileStorage;
pub use models::{IdKind, UrlEntity};

#[async_trait]
pub trait UrlStorage: Send + Sync {
    /// 后端名称（sqlite / postgres / file）
    fn backend_name(&self) -> &str;

    /// 该后端期望的短 ID 生成方式
    fn id_kind(&self) -> IdKind;

    /// 插入一条记录
    ///
    /// 长链接已被未删除的记录占用时返回 `UniqueViolation`，
    /// 短 ID 已存在时返回 `ShortIdTaken`。
    async fn add_entity(&self, entity: UrlEntity) -> Result<()>;

    /// 按长链接查找未删除的记录
    async fn select_by_long_url(&self, long_url: &str) -> Result<Option<UrlEntity>>;

    /// 按短 ID 查找，已删除的记录也会返回（`deleted = true`）
    async fn select_by_short_id(&self, short_id: &str) -> Result<Option<UrlEntity>>;

    /// 列出用户的全部记录，包括已删除的
    async fn select_by_user(&self, user_id: &str) -> Result<Vec<UrlEntity>>;

    /// 批量插入，全部成功或全部失败
    async fn add_entity_batch(&self, user_id: &str, entities: Vec<UrlEntity>) -> Result<()>;

    /// 将用户拥有的短 ID 标记为删除，返回本次新标记的数量
    ///
    /// 不存在、不属于该用户或已删除的 ID 直接忽略。
    async fn set_deleted_batch(&self, user_id: &str, short_ids: &[String]) -> Result<u64>;

    /// 存活检查
    async fn ping(&self) -> Result<()>;

    /// 关闭前刷盘 / 释放连接
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建存储后端：`database_url` 非空时使用数据库，否则使用文件日志
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn UrlStorage>> {
        if config.database_url.is_empty() {
            info!("DATABASE_DSN not set, using file storage");
            let storage = FileStorage::open(&config.file_path)?;
            return Ok(Arc::new(storage));
        }

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(&config.database_url)?;
        let storage =
            SeaOrmStorage::new(&config.database_url, &backend_type, config.pool_size).await?;
        Ok(Arc::new(storage))
    }
}
