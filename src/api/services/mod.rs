pub mod ping;
pub mod redirect;
pub mod shorten;
pub mod user_urls;

pub use ping::PingService;
pub use redirect::RedirectService;
pub use shorten::ShortenService;
pub use user_urls::UserUrlsService;

use actix_web::web;

use crate::api::errors::json_error_handler;

/// 请求体上限
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 注册全部路由，服务器与测试共用
///
/// `/{id}` 必须最后注册。
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_BODY_BYTES)
            .error_handler(json_error_handler),
    )
    .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
    .route("/", web::post().to(ShortenService::shorten_text))
    .route("/ping", web::get().to(PingService::ping))
    .route("/user/urls", web::get().to(UserUrlsService::list))
    .service(
        web::scope("/api")
            .route("/shorten", web::post().to(ShortenService::shorten_json))
            .route("/shorten/batch", web::post().to(ShortenService::shorten_batch))
            .route("/user/urls", web::get().to(UserUrlsService::list))
            .route("/user/urls", web::delete().to(UserUrlsService::delete)),
    )
    .route("/{id}", web::get().to(RedirectService::handle_redirect));
}
