//! 服务注册代理
//!
//! 启动时把本实例注册到注册中心，然后在 `PORT` 上提供健康检查端点，Ctrl+C 后关闭。

use anyhow::{Context, Result, anyhow};
use flare_discovery::health::{self, BasicHealthInfo};
use flare_discovery::registry::bootstrap;
use flare_discovery::{BootstrapSettings, ServiceDiscovery, telemetry};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    telemetry::init_tracing(json_logs).map_err(|e| anyhow!(e))?;

    let service_name =
        std::env::var("SERVICE_NAME").unwrap_or_else(|_| "flare-discovery-agent".to_string());
    let instance_name =
        std::env::var("INSTANCE_NAME").unwrap_or_else(|_| format!("{}-1", service_name));

    let settings = BootstrapSettings::from_env().context("invalid bootstrap settings")?;
    let discovery = bootstrap::register_local_instance(&instance_name, &service_name, &settings)
        .await
        .context("failed to create service discovery client")?;

    let listener = TcpListener::bind(("0.0.0.0", settings.port))
        .await
        .with_context(|| format!("failed to bind health endpoint on port {}", settings.port))?;
    info!(port = settings.port, "Health endpoint listening");

    axum::serve(listener, health::router(BasicHealthInfo::now))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received (Ctrl+C)");
        })
        .await
        .context("health endpoint failed")?;

    discovery.shutdown();
    Ok(())
}
