//! DevOps 智能体 HTTP 服务
//!
//! 入口：加载配置、初始化日志、构建 Agent，并在 [server] 配置的地址上提供 HTTP 接口。
//! 可选参数：配置文件路径（覆盖 config/default.toml 中的键）。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use devops_agent::api::{router, AppState};
use devops_agent::config::load_config;
use devops_agent::{observability, AgentBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    cfg.validate().context("Invalid config")?;

    observability::init(&cfg.app.log_level);
    tracing::info!(
        service = %cfg.app.name,
        environment = %cfg.app.environment,
        "Starting"
    );

    let agent = AgentBuilder::new(cfg.clone())
        .with_system_prompt_from_file()
        .build()
        .await
        .context("Failed to build agent")?;

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let state = Arc::new(AppState::new(Arc::new(agent), cfg));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

/// Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
