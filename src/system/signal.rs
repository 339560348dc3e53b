//! OS shutdown signals

use tracing::warn;

/// 等待任意一个关闭信号，返回信号名称
///
/// Unix: SIGINT / SIGTERM / SIGHUP / SIGQUIT；其他平台仅 Ctrl+C。
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut term, mut hup, mut quit) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
        signal(SignalKind::quit()),
    ) {
        (Ok(term), Ok(hup), Ok(quit)) => (term, hup, quit),
        _ => {
            warn!("Failed to register Unix signal handlers, falling back to Ctrl+C only");
            return ctrl_c().await;
        }
    };

    tokio::select! {
        name = ctrl_c() => name,
        _ = term.recv() => "SIGTERM",
        _ = hup.recv() => "SIGHUP",
        _ = quit.recv() => "SIGQUIT",
    }
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        );
    }
    "SIGINT"
}
