use std::sync::Arc;

use crate::config::ServerConfig;
use crate::dispatcher::DeleteDispatcher;
use crate::repository::UrlRepository;
use crate::utils::short_url;

/// 处理器共享的应用状态，由启动流程显式构造后注入
pub struct AppState {
    pub repository: Arc<UrlRepository>,
    pub dispatcher: Arc<DeleteDispatcher>,
    pub base_url: String,
    /// 未知短链接返回 400 而不是 404
    pub not_found_as_bad_request: bool,
}

impl AppState {
    pub fn new(
        repository: Arc<UrlRepository>,
        dispatcher: Arc<DeleteDispatcher>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            base_url: config.base_url.clone(),
            not_found_as_bad_request: config.not_found_as_bad_request,
        }
    }

    pub fn short_url(&self, short_id: &str) -> String {
        short_url(&self.base_url, short_id)
    }
}
