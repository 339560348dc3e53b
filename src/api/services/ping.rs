use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};
use tracing::{error, trace};

use crate::api::state::AppState;

pub struct PingService;

impl PingService {
    /// `GET /ping`，只检查存储后端是否可达
    pub async fn ping(state: web::Data<AppState>) -> HttpResponse {
        match state.repository.ping().await {
            Ok(()) => {
                trace!("Storage ping ok ({})", state.repository.backend_name());
                HttpResponse::Ok()
                    .insert_header(ContentType::plaintext())
                    .body("OK")
            }
            Err(e) => {
                error!("Storage ping failed: {}", e);
                HttpResponse::InternalServerError()
                    .insert_header(ContentType::plaintext())
                    .body("storage unavailable")
            }
        }
    }
}
