use actix_web::http::header::{self, ContentType};
use actix_web::{HttpResponse, web};
use tracing::trace;

use crate::api::state::AppState;
use crate::errors::ShortenerError;

pub struct RedirectService;

impl RedirectService {
    /// `GET /{id}`，307 跳转到长链接
    pub async fn handle_redirect(
        state: web::Data<AppState>,
        path: web::Path<String>,
    ) -> Result<HttpResponse, ShortenerError> {
        let short_id = path.into_inner();

        match state.repository.select_by_short_id(&short_id).await? {
            Some(entity) => Ok(HttpResponse::TemporaryRedirect()
                .insert_header((header::LOCATION, entity.long_url))
                .finish()),
            None => {
                trace!("Short id not found or deleted: {}", short_id);
                Ok(Self::not_found_response(&state))
            }
        }
    }

    fn not_found_response(state: &AppState) -> HttpResponse {
        let mut builder = if state.not_found_as_bad_request {
            HttpResponse::BadRequest()
        } else {
            HttpResponse::NotFound()
        };
        builder
            .insert_header(ContentType::plaintext())
            .body("short url not found")
    }
}
