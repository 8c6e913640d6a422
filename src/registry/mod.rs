//! 远端注册中心模块
//!
//! 本地目录是查询的唯一数据来源，远端注册只是尽力而为的旁路：
//! 失败只记录日志，不回滚本地目录，也不自动重试。

pub mod bootstrap;
pub mod consul;
pub mod definition;

use async_trait::async_trait;

use crate::error::RegistryError;

pub use consul::ConsulRegistryClient;
pub use definition::{
    ConsulServiceDefinition, HttpCheckDefinition, HttpServiceCheck, NodeMeta, ServiceDetail,
};

/// 注册中心客户端
///
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait RegistryClient<I>: Send + Sync {
    /// 推送单个实例
    ///
    /// # 返回
    /// * `Ok(())` - 注册中心返回 200
    /// * `Err` - 网络错误或非 200 响应
    async fn register_instance(&self, instance: &I) -> Result<(), RegistryError>;
}
