//! 服务发现错误处理模块
//!
//! - 查询/订阅错误（`DiscoveryError`）统一通过回调通道返回，不会同步抛出
//! - 远端注册错误（`RegistryError`）只在本地记录日志，不向调用方传播
//! - 配置错误（`ConfigError`）在启动阶段返回，由调用方决定是否终止进程

use std::fmt;
use thiserror::Error;

/// 服务发现错误
///
/// 每次 `lookup` 只会收到一个结果：成功，或以下错误之一
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryError {
    /// 客户端已关闭
    #[error("service discovery is unavailable")]
    Unavailable,

    /// 服务从未注册
    #[error("unknown service")]
    UnknownService,

    /// 超过查询截止时间
    #[error("lookup timed out")]
    TimedOut,
}

/// 查询结果类型
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// 订阅结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionReason {
    /// 客户端关闭时仍处于订阅状态
    ServiceDiscoveryUnavailable,
    /// 订阅方主动取消
    CancellationRequested,
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReason::ServiceDiscoveryUnavailable => f.write_str("service discovery unavailable"),
            CompletionReason::CancellationRequested => f.write_str("cancellation requested"),
        }
    }
}

/// 远端注册中心错误
#[derive(Error, Debug)]
pub enum RegistryError {
    /// 注册中心地址无效
    #[error("invalid registry url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// 实例序列化失败
    #[error("failed to serialize service instance: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 网络请求失败
    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 非 200 响应
    #[error("unexpected response status {status} from {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 缺少必需的配置项
    #[error("{key} missing")]
    Missing { key: &'static str },

    /// 配置项格式无效
    #[error("{key} value invalid: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 启动注册错误
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
