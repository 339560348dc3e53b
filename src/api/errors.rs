//! HTTP 错误映射
//!
//! 处理器直接用 `?` 返回 `ShortenerError`，由这里转换为纯文本响应。
//! 5xx 只返回通用描述，详情写入日志。

use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{HttpRequest, HttpResponse, ResponseError, error::JsonPayloadError};
use tracing::{debug, error};

use crate::errors::ShortenerError;

impl ResponseError for ShortenerError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = if status.is_server_error() {
            error!("Request failed: {}", self);
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            debug!("Request rejected: {}", self);
            self.message().to_string()
        };

        HttpResponse::build(status)
            .insert_header(ContentType::plaintext())
            .body(body)
    }
}

/// JSON 解析失败统一返回 400
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ShortenerError::validation(format!("invalid JSON body: {}", err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_rt::test]
    async fn test_client_error_keeps_message() {
        let resp = ShortenerError::validation("url is required").error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(body, "url is required");
    }

    #[actix_rt::test]
    async fn test_server_error_hides_details() {
        let resp = ShortenerError::database_connection("password=hunter2").error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(body, "Internal Server Error");
    }
}
