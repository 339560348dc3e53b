use actix_web::dev::ServerHandle;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::dispatcher::DeleteDispatcher;
use crate::repository::UrlRepository;

/// 按顺序关闭：HTTP 服务器 -> 删除调度器 -> 存储
///
/// 每个阶段最多等待 `grace`，超时只记录错误并继续下一阶段。
pub async fn perform_shutdown(
    server: &ServerHandle,
    dispatcher: &DeleteDispatcher,
    repository: &UrlRepository,
    grace: Duration,
) {
    // 停止接收新连接，等待进行中的请求
    match timeout(grace, server.stop(true)).await {
        Ok(()) => info!("HTTP server stopped"),
        Err(_) => error!("HTTP server did not stop within {:?}", grace),
    }

    // dispatcher.shutdown 自带宽限期，这里只需等待结果
    let report = dispatcher.shutdown(grace).await;
    if report.aborted > 0 {
        warn!(
            "{} delete worker(s) aborted with pending deletions",
            report.aborted
        );
    }

    match timeout(grace, repository.close()).await {
        Ok(Ok(())) => info!("Storage closed"),
        Ok(Err(e)) => error!("Failed to close storage: {}", e),
        Err(_) => error!("Closing storage timed out after {:?}", grace),
    }
}
