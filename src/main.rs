//! Bee 浏览器智能体服务
//!
//! 入口：加载配置、初始化日志、构建会话注册表并启动 HTTP 服务；
//! 收到 Ctrl+C / SIGTERM 后停止接收请求并关闭所有会话的浏览器。
//!
//! 启动: cargo run --bin bee-browser（需 feature web，默认开启）

#[cfg(feature = "web")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Context;
    use bee_browser::agent::create_registry;
    use bee_browser::config::{load_config, AppConfig};
    use bee_browser::core::{close_all_sessions, ShutdownManager, ShutdownReason};
    use bee_browser::integrations::{create_router, HttpState};

    bee_browser::observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let registry = Arc::new(create_registry(&cfg));
    let app = create_router(Arc::new(HttpState {
        registry: Arc::clone(&registry),
    }));

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let addr = cfg.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Bee browser agent listening on http://{}", addr);

    let mut reasons = shutdown.subscribe();
    let token = shutdown.token();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await;
    if let Err(e) = &served {
        shutdown.shutdown(ShutdownReason::FatalError(e.to_string()));
    }
    if let Ok(reason) = reasons.try_recv() {
        tracing::info!(?reason, "shutting down");
    }

    // 服务异常退出时也要先关掉浏览器
    let timeout = Duration::from_secs(cfg.server.shutdown_timeout_secs);
    let closed = close_all_sessions(&registry, timeout).await;
    tracing::info!(sessions = closed.len(), "shutdown complete");
    served.context("HTTP server failed")
}

#[cfg(not(feature = "web"))]
fn main() {
    eprintln!("请使用 --features web 编译: cargo run --bin bee-browser --features web");
    std::process::exit(1);
}
