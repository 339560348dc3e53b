//! Mutation operations for SeaOrmStorage
//!
//! This module contains all write database operations.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait, sea_query::Expr};
use tracing::{debug, warn};

use super::SeaOrmStorage;
use super::converters::{entity_to_active_model, map_insert_error};
use crate::errors::{Result, ShortenerError};
use crate::storage::UrlEntity;

use migration::entities::url;

/// 单条 UPDATE 中 `short_id IN (...)` 的最大 id 数
pub const MARK_DELETED_CHUNK: usize = 1000;

impl SeaOrmStorage {
    pub(super) async fn insert_one(&self, entity: &UrlEntity) -> Result<()> {
        url::Entity::insert(entity_to_active_model(entity))
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| map_insert_error(e, entity))?;
        Ok(())
    }

    /// 批量插入（使用事务），任一条失败则整体回滚
    pub(super) async fn insert_batch(&self, user_id: &str, entities: Vec<UrlEntity>) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await.map_err(|e| {
            ShortenerError::database_operation(format!("Failed to begin transaction: {}", e))
        })?;

        for mut entity in entities {
            entity.user_id = user_id.to_string();
            if let Err(e) = url::Entity::insert(entity_to_active_model(&entity))
                .exec_without_returning(&txn)
                .await
            {
                let err = map_insert_error(e, &entity);
                if let Err(rollback_err) = txn.rollback().await {
                    warn!("Failed to roll back batch insert: {}", rollback_err);
                }
                return Err(err);
            }
        }

        txn.commit().await.map_err(|e| {
            ShortenerError::database_operation(format!("Failed to commit transaction: {}", e))
        })?;
        Ok(())
    }

    /// 分块 UPDATE 标记删除，只影响属于该用户且尚未删除的记录
    ///
    /// 每块最多 `MARK_DELETED_CHUNK` 个 id，避免超过数据库的绑定参数上限。
    pub(super) async fn mark_deleted(&self, user_id: &str, short_ids: &[String]) -> Result<u64> {
        let mut affected = 0;
        for chunk in short_ids.chunks(MARK_DELETED_CHUNK) {
            let result = url::Entity::update_many()
                .col_expr(url::Column::Deleted, Expr::value(true))
                .filter(url::Column::UserId.eq(user_id))
                .filter(url::Column::ShortId.is_in(chunk.iter().cloned()))
                .filter(url::Column::Deleted.eq(false))
                .exec(&self.db)
                .await?;
            affected += result.rows_affected;
        }

        debug!(
            "Marked {} of {} url(s) deleted for user {}",
            affected,
            short_ids.len(),
            user_id
        );
        Ok(affected)
    }
}
