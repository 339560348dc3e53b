use sea_orm::{DbErr, SqlErr};

use crate::errors::ShortenerError;
use crate::storage::UrlEntity;
use migration::entities::url;

/// 将 Sea-ORM Model 转换为 UrlEntity
pub fn model_to_entity(model: url::Model) -> UrlEntity {
    UrlEntity {
        user_id: model.user_id,
        short_id: model.short_id,
        long_url: model.long_url,
        deleted: model.deleted,
        created_at: model.created_at,
    }
}

/// 将 UrlEntity 转换为 ActiveModel（仅用于插入）
pub fn entity_to_active_model(entity: &UrlEntity) -> url::ActiveModel {
    use sea_orm::ActiveValue::Set;

    url::ActiveModel {
        short_id: Set(entity.short_id.clone()),
        user_id: Set(entity.user_id.clone()),
        long_url: Set(entity.long_url.clone()),
        deleted: Set(false),
        created_at: Set(entity.created_at),
    }
}

/// 区分唯一约束冲突的来源：长链接索引 / 主键
pub fn map_insert_error(err: DbErr, entity: &UrlEntity) -> ShortenerError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("long_url") => {
            ShortenerError::unique_violation(&entity.long_url)
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ShortenerError::short_id_taken(&entity.short_id)
        }
        _ => err.into(),
    }
}
