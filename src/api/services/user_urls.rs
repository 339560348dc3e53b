use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::identity::UserId;
use crate::api::state::AppState;
use crate::dispatcher::DeleteTask;
use crate::errors::ShortenerError;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

pub struct UserUrlsService;

impl UserUrlsService {
    /// `GET /user/urls`，只返回未删除的记录
    pub async fn list(
        state: web::Data<AppState>,
        user: UserId,
    ) -> Result<HttpResponse, ShortenerError> {
        let urls: Vec<UserUrl> = state
            .repository
            .select_by_user(user.as_str())
            .await?
            .into_iter()
            .filter(|entity| !entity.deleted)
            .map(|entity| UserUrl {
                short_url: state.short_url(&entity.short_id),
                original_url: entity.long_url,
            })
            .collect();

        if urls.is_empty() {
            return Ok(HttpResponse::NoContent().finish());
        }
        Ok(HttpResponse::Ok().json(urls))
    }

    /// `DELETE /api/user/urls`，入队后立即返回 202
    pub async fn delete(
        state: web::Data<AppState>,
        user: UserId,
        payload: web::Json<Vec<String>>,
    ) -> Result<HttpResponse, ShortenerError> {
        let short_ids = payload.into_inner();
        if short_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ShortenerError::validation("short ids must not be empty"));
        }

        debug!(
            "Queueing delete of {} id(s) for {}",
            short_ids.len(),
            user.as_str()
        );
        state
            .dispatcher
            .submit(DeleteTask::new(user.0, short_ids))
            .await?;

        Ok(HttpResponse::Accepted().finish())
    }
}
