//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use super::SeaOrmStorage;
use super::converters::model_to_entity;
use crate::errors::Result;
use crate::storage::UrlEntity;

use migration::entities::url;

impl SeaOrmStorage {
    pub(super) async fn find_active_by_long_url(&self, long_url: &str) -> Result<Option<UrlEntity>> {
        let model = url::Entity::find()
            .filter(url::Column::LongUrl.eq(long_url))
            .filter(url::Column::Deleted.eq(false))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_entity))
    }

    pub(super) async fn find_by_short_id(&self, short_id: &str) -> Result<Option<UrlEntity>> {
        let model = url::Entity::find_by_id(short_id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_entity))
    }

    pub(super) async fn find_by_user(&self, user_id: &str) -> Result<Vec<UrlEntity>> {
        let models = url::Entity::find()
            .filter(url::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_entity).collect())
    }
}
