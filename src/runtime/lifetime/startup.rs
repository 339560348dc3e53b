use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{AppState, IdentityService};
use crate::config::StaticConfig;
use crate::dispatcher::{DeleteDispatcher, FaultReceiver};
use crate::repository::UrlRepository;
use crate::storage::StorageFactory;

/// 启动上下文：所有共享组件都在这里显式构造，再注入到 HTTP 层
pub struct StartupContext {
    pub repository: Arc<UrlRepository>,
    pub dispatcher: Arc<DeleteDispatcher>,
    pub faults: FaultReceiver,
    pub identity: Arc<IdentityService>,
    pub state: Arc<AppState>,
}

/// 准备服务器启动的上下文
/// 包括存储、仓储、删除调度器和用户标识
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create(&config.storage)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let repository = Arc::new(UrlRepository::from_config(storage, config));
    repository
        .ping()
        .await
        .context("Storage backend is not reachable")?;

    let (dispatcher, faults) = DeleteDispatcher::start(repository.clone(), &config.dispatcher);
    let identity = Arc::new(IdentityService::from_config(&config.identity));
    let state = Arc::new(AppState::new(
        repository.clone(),
        dispatcher.clone(),
        &config.server,
    ));

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        repository,
        dispatcher,
        faults,
        identity,
        state,
    })
}
