//! Server mode
//!
//! 启动 HTTP 服务器，并在收到关闭信号或删除调度器上报故障时优雅退出。

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::{
    self,
    middleware::{IdentityMiddleware, RequestLogMiddleware},
};
use crate::config::StaticConfig;
use crate::runtime::lifetime::{self, StartupContext};
use crate::system::signal::wait_for_shutdown_signal;

/// 退出原因
#[derive(Debug)]
enum ExitReason {
    Signal(&'static str),
    Fault(String),
    ServerExited,
}

pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let StartupContext {
        repository,
        dispatcher,
        mut faults,
        identity,
        state,
    } = lifetime::prepare_server_startup(config).await?;

    let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    let bind_address = config.bind_address();
    let state = web::Data::from(state);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(IdentityMiddleware::new(identity.clone()))
            .wrap(Compress::default())
            .wrap(RequestLogMiddleware)
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")))
            .app_data(state.clone())
            .configure(api::configure)
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .shutdown_timeout(grace.as_secs())
    .disable_signals()
    .workers(config.server.cpu_count.max(1));

    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(&bind_address)?.run();
    let handle = server.handle();
    let mut server_task = actix_web::rt::spawn(server);

    let reason = tokio::select! {
        signal = wait_for_shutdown_signal() => ExitReason::Signal(signal),
        Some(fault) = faults.recv() => ExitReason::Fault(fault.to_string()),
        res = &mut server_task => {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("HTTP server error: {}", e),
                Err(e) => error!("HTTP server task failed: {}", e),
            }
            ExitReason::ServerExited
        }
    };

    match &reason {
        ExitReason::Signal(name) => info!("Received {}, shutting down...", name),
        ExitReason::Fault(fault) => error!("Delete pipeline fault, shutting down: {}", fault),
        ExitReason::ServerExited => warn!("HTTP server exited, shutting down..."),
    }

    lifetime::perform_shutdown(&handle, &dispatcher, &repository, grace).await;
    info!("Shutdown complete");

    if let ExitReason::Fault(fault) = reason {
        anyhow::bail!("delete pipeline failed: {}", fault);
    }
    Ok(())
}
