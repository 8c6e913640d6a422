//! 服务发现配置
//!
//! 配置通过构造函数显式传入，不依赖全局容器

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// 服务发现地址环境变量
pub const SERVICE_DISCOVERY_URL_KEY: &str = "SERVICE_DISCOVERY_URL";
/// 健康检查地址环境变量（注册中心据此探测本服务）
pub const SERVICE_CHECK_URL_KEY: &str = "SERVICE_CHECK_URL";
/// 对外端口环境变量
pub const PORT_KEY: &str = "PORT";

pub const DEFAULT_DISCOVERY_URL: &str = "http://localhost:8500";
pub const DEFAULT_REGISTRATION_PATH: &str = "/v1/catalog/register";
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// 服务发现客户端配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// 注册中心基础地址
    #[serde(default = "default_url")]
    pub url: String,

    /// 注册路径（相对于 `url`）
    #[serde(default = "default_registration_path")]
    pub registration_path: String,

    /// 默认查询超时（毫秒），调用时未指定截止时间则使用该值
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,

    /// 注册请求超时（毫秒）
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_url() -> String {
    DEFAULT_DISCOVERY_URL.to_string()
}

fn default_registration_path() -> String {
    DEFAULT_REGISTRATION_PATH.to_string()
}

fn default_lookup_timeout_ms() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            registration_path: default_registration_path(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl DiscoveryConfig {
    /// 使用指定注册中心地址创建配置
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// 设置默认查询超时
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 设置注册路径
    pub fn with_registration_path(mut self, path: impl Into<String>) -> Self {
        self.registration_path = path.into();
        self
    }

    /// 设置注册请求超时
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn default_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 从 TOML 文件加载
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: DiscoveryConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// 从环境变量加载（`SERVICE_DISCOVERY_URL`）
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载
    pub fn from_source<F>(source: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required_url(&source, SERVICE_DISCOVERY_URL_KEY)?;
        Ok(Self::new(url))
    }
}

/// 启动注册所需的环境配置
///
/// 所有值在启动时立即校验，缺失或无效视为致命错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSettings {
    pub discovery_url: String,
    pub port: u16,
    pub check_url: String,
}

impl BootstrapSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source<F>(source: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discovery_url = required_url(&source, SERVICE_DISCOVERY_URL_KEY)?;

        let port_value = source(PORT_KEY).ok_or(ConfigError::Missing { key: PORT_KEY })?;
        let port = match port_value.trim().parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => {
                return Err(ConfigError::Invalid {
                    key: PORT_KEY,
                    value: port_value,
                });
            }
        };

        let check_url = required_url(&source, SERVICE_CHECK_URL_KEY)?;

        Ok(Self {
            discovery_url,
            port,
            check_url,
        })
    }

    /// 对应的客户端配置
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig::new(self.discovery_url.clone())
    }
}

fn required_url<F>(source: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = source(key).ok_or(ConfigError::Missing { key })?;
    match reqwest::Url::parse(value.trim()) {
        Ok(url) if url.has_host() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}
