use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::identity::UserId;
use crate::api::state::AppState;
use crate::errors::ShortenerError;
use crate::repository::{BatchItem, Shortened};

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}

fn require_url(raw: &str) -> Result<&str, ShortenerError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ShortenerError::validation("url must not be empty"));
    }
    Ok(url)
}

pub struct ShortenService;

impl ShortenService {
    /// `POST /`，请求体为纯文本长链接
    pub async fn shorten_text(
        state: web::Data<AppState>,
        user: UserId,
        body: String,
    ) -> Result<HttpResponse, ShortenerError> {
        let url = require_url(&body)?;
        let shortened = state.repository.shorten(user.as_str(), url).await?;
        let short_url = state.short_url(shortened.short_id());

        Ok(Self::status_for(&shortened)
            .insert_header(ContentType::plaintext())
            .body(short_url))
    }

    /// `POST /api/shorten`
    pub async fn shorten_json(
        state: web::Data<AppState>,
        user: UserId,
        payload: web::Json<ShortenRequest>,
    ) -> Result<HttpResponse, ShortenerError> {
        let url = require_url(&payload.url)?;
        let shortened = state.repository.shorten(user.as_str(), url).await?;

        Ok(Self::status_for(&shortened).json(ShortenResponse {
            result: state.short_url(shortened.short_id()),
        }))
    }

    /// `POST /api/shorten/batch`，全部成功或全部失败
    pub async fn shorten_batch(
        state: web::Data<AppState>,
        user: UserId,
        payload: web::Json<Vec<BatchRequestItem>>,
    ) -> Result<HttpResponse, ShortenerError> {
        let items = payload
            .into_inner()
            .into_iter()
            .map(|item| {
                let long_url = require_url(&item.original_url)?.to_string();
                Ok(BatchItem {
                    correlation_id: item.correlation_id,
                    long_url,
                })
            })
            .collect::<Result<Vec<_>, ShortenerError>>()?;

        let count = items.len();
        let results = state.repository.shorten_batch(user.as_str(), items).await?;
        if count > 0 {
            info!("Created {} short links in batch for {}", count, user.as_str());
        }

        let body: Vec<BatchResponseItem> = results
            .into_iter()
            .map(|r| BatchResponseItem {
                short_url: state.short_url(&r.short_id),
                correlation_id: r.correlation_id,
            })
            .collect();

        Ok(HttpResponse::Created().json(body))
    }

    fn status_for(shortened: &Shortened) -> actix_web::HttpResponseBuilder {
        match shortened {
            Shortened::Created(_) => HttpResponse::Created(),
            Shortened::Existing(id) => {
                debug!("Long url already shortened as {}", id);
                HttpResponse::Conflict()
            }
        }
    }
}
