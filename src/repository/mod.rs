//! URL 仓储
//!
//! 对 `UrlStorage` 的统一封装，HTTP 处理器与删除调度器都只依赖它：
//! - 每次存储调用都带超时，超时后丢弃进行中的 future 并返回 `Timeout`
//! - 负责短 ID 分配与冲突重试（上限由 `IdGenerator` 决定）
//! - 长链接冲突时回读已有的短 ID

mod ids;

pub use ids::IdGenerator;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::StaticConfig;
use crate::errors::{Result, ShortenerError};
use crate::storage::{UrlEntity, UrlStorage};

/// 缩短结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    /// 新建
    Created(String),
    /// 长链接已存在，返回已有短 ID
    Existing(String),
}

impl Shortened {
    pub fn short_id(&self) -> &str {
        match self {
            Shortened::Created(id) | Shortened::Existing(id) => id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Shortened::Created(_))
    }
}

/// 批量缩短的输入项
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub correlation_id: String,
    pub long_url: String,
}

/// 批量缩短的输出项，顺序与输入一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchShortened {
    pub correlation_id: String,
    pub short_id: String,
}

pub struct UrlRepository {
    storage: Arc<dyn UrlStorage>,
    timeout: Duration,
    ids: IdGenerator,
}

impl UrlRepository {
    pub fn new(storage: Arc<dyn UrlStorage>, timeout: Duration, ids: IdGenerator) -> Self {
        Self {
            storage,
            timeout,
            ids,
        }
    }

    pub fn from_config(storage: Arc<dyn UrlStorage>, config: &StaticConfig) -> Self {
        let ids = IdGenerator::new(
            storage.id_kind(),
            config.storage.id_length,
            config.storage.id_attempts,
        );
        Self::new(
            storage,
            Duration::from_secs(config.server.request_timeout_secs),
            ids,
        )
    }

    pub fn backend_name(&self) -> &str {
        self.storage.backend_name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn with_deadline<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ShortenerError::timeout(format!(
                "{} did not finish within {:?}",
                operation, self.timeout
            ))),
        }
    }

    pub async fn add_entity(&self, entity: UrlEntity) -> Result<()> {
        self.with_deadline("add_entity", self.storage.add_entity(entity))
            .await
    }

    pub async fn select_by_long_url(&self, long_url: &str) -> Result<Option<UrlEntity>> {
        self.with_deadline(
            "select_by_long_url",
            self.storage.select_by_long_url(long_url),
        )
        .await
    }

    /// 按短 ID 查找，已删除的记录视为不存在
    pub async fn select_by_short_id(&self, short_id: &str) -> Result<Option<UrlEntity>> {
        Ok(self.lookup(short_id).await?.filter(|e| !e.deleted))
    }

    /// 按短 ID 查找，保留删除标记
    pub async fn lookup(&self, short_id: &str) -> Result<Option<UrlEntity>> {
        self.with_deadline(
            "select_by_short_id",
            self.storage.select_by_short_id(short_id),
        )
        .await
    }

    pub async fn select_by_user(&self, user_id: &str) -> Result<Vec<UrlEntity>> {
        self.with_deadline("select_by_user", self.storage.select_by_user(user_id))
            .await
    }

    pub async fn add_entity_batch(&self, user_id: &str, entities: Vec<UrlEntity>) -> Result<()> {
        self.with_deadline(
            "add_entity_batch",
            self.storage.add_entity_batch(user_id, entities),
        )
        .await
    }

    pub async fn set_deleted_batch(&self, user_id: &str, short_ids: &[String]) -> Result<u64> {
        self.with_deadline(
            "set_deleted_batch",
            self.storage.set_deleted_batch(user_id, short_ids),
        )
        .await
    }

    pub async fn ping(&self) -> Result<()> {
        self.with_deadline("ping", self.storage.ping()).await
    }

    pub async fn close(&self) -> Result<()> {
        self.storage.close().await
    }

    /// 为长链接分配短 ID
    ///
    /// 长链接已存在时返回 `Existing`；短 ID 冲突时重新生成，超过上限返回 `IdExhausted`。
    pub async fn shorten(&self, user_id: &str, long_url: &str) -> Result<Shortened> {
        let attempts = self.ids.attempts();

        for attempt in 1..=attempts {
            let short_id = self.ids.next_id();
            let entity = UrlEntity::new(user_id, short_id.clone(), long_url);

            match self.add_entity(entity).await {
                Ok(()) => return Ok(Shortened::Created(short_id)),
                Err(ShortenerError::UniqueViolation(_)) => {
                    if let Some(existing) = self.select_by_long_url(long_url).await? {
                        return Ok(Shortened::Existing(existing.short_id));
                    }
                    // 冲突的记录在回读前被删除，重新插入
                    debug!("Conflicting url vanished before read-back, retrying insert");
                }
                Err(ShortenerError::ShortIdTaken(id)) => {
                    debug!("Short id {} already taken (attempt {})", id, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ShortenerError::id_exhausted(format!(
            "could not allocate a short id after {} attempts",
            attempts
        )))
    }

    /// 批量缩短，全部成功或全部失败
    ///
    /// 短 ID 冲突时整批重新生成；长链接冲突直接返回 `UniqueViolation`。
    pub async fn shorten_batch(
        &self,
        user_id: &str,
        items: Vec<BatchItem>,
    ) -> Result<Vec<BatchShortened>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let attempts = self.ids.attempts();

        for attempt in 1..=attempts {
            let entities: Vec<UrlEntity> = items
                .iter()
                .map(|item| UrlEntity::new(user_id, self.ids.next_id(), item.long_url.clone()))
                .collect();
            let results: Vec<BatchShortened> = items
                .iter()
                .zip(&entities)
                .map(|(item, entity)| BatchShortened {
                    correlation_id: item.correlation_id.clone(),
                    short_id: entity.short_id.clone(),
                })
                .collect();

            match self.add_entity_batch(user_id, entities).await {
                Ok(()) => return Ok(results),
                Err(ShortenerError::ShortIdTaken(id)) => {
                    debug!("Short id {} already taken in batch (attempt {})", id, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ShortenerError::id_exhausted(format!(
            "could not allocate short ids for batch after {} attempts",
            attempts
        )))
    }
}
