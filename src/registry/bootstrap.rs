//! 启动注册
//!
//! 进程启动时从环境变量读取注册中心地址、对外端口和健康检查地址，
//! 把本实例注册到注册中心，健康检查指向本服务的 `/health` 端点。

use tracing::{debug, info};

use crate::config::BootstrapSettings;
use crate::discovery::{ConsulServiceDiscovery, ServiceDiscovery};
use crate::error::BootstrapError;
use crate::registry::definition::{
    ConsulServiceDefinition, HttpCheckDefinition, HttpServiceCheck, NodeMeta, ServiceDetail,
};

/// 启动注册使用的客户端类型
pub type SelfRegistration = ConsulServiceDiscovery<String, ConsulServiceDefinition>;

/// 健康检查探测间隔
pub const CHECK_INTERVAL: &str = "30s";
/// 健康检查超时
pub const CHECK_TIMEOUT: &str = "5s";

/// 本机主机名（`HOSTNAME` 未设置时为 "localhost"）
pub fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// 构建本实例的服务定义
pub fn local_instance_definition(
    instance_name: &str,
    service_name: &str,
    settings: &BootstrapSettings,
    hostname: &str,
) -> ConsulServiceDefinition {
    let check = HttpServiceCheck::new(
        "http check",
        "passing",
        HttpCheckDefinition::new(
            "http",
            "http check",
            settings.check_url.clone(),
            CHECK_INTERVAL,
            CHECK_TIMEOUT,
        ),
    );

    ConsulServiceDefinition::new(
        hostname,
        hostname,
        NodeMeta::external(),
        ServiceDetail::new(instance_name, service_name, settings.port),
    )
    .with_check(check)
}

/// 注册本实例，返回客户端供调用方在退出时关闭
pub async fn register_local_instance(
    instance_name: &str,
    service_name: &str,
    settings: &BootstrapSettings,
) -> Result<SelfRegistration, BootstrapError> {
    debug!(url = %settings.discovery_url, "Service discovery URL");

    let discovery = SelfRegistration::new(settings.discovery_config())?;
    let definition = local_instance_definition(instance_name, service_name, settings, &local_hostname());

    info!(
        service = %service_name,
        instance = %instance_name,
        port = settings.port,
        "Registering local instance"
    );
    discovery
        .register(service_name.to_string(), vec![definition])
        .await;

    Ok(discovery)
}

/// 从环境变量读取配置并注册本实例
///
/// 配置缺失或无效时返回错误，调用方应视为致命错误
pub async fn register_from_env(
    instance_name: &str,
    service_name: &str,
) -> Result<SelfRegistration, BootstrapError> {
    let settings = BootstrapSettings::from_env()?;
    register_local_instance(instance_name, service_name, &settings).await
}
