//! 服务发现模块
//!
//! 维护服务名到实例列表的内存目录，提供带超时的查询、可取消的变更订阅，
//! 并把本地注册尽力同步到 Consul 风格的 HTTP 注册中心。

pub mod consul;
pub mod directory;
pub mod lifecycle;
pub mod lookup;
pub mod registration;
pub mod subscription;

use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{DiscoveryError, Result};

pub use consul::{ConsulServiceDiscovery, DiscoveryBuilder};
pub use directory::{InstanceDirectory, Swapped};
pub use lifecycle::Lifecycle;
pub use lookup::{InstanceSource, LookupCallback, LookupEngine};
pub use registration::RegistrationManager;
pub use subscription::{CancellationToken, CompletionHandler, NextResultHandler, SubscriptionRegistry};

/// 服务发现接口
///
/// 所有错误都通过回调（或 `lookup_async` 的返回值）传递，
/// 唯一的同步路径是关闭后 `subscribe` 立即调用完成回调。
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// 服务名
    type Service: Eq + Hash + Clone + Debug + Send + Sync + 'static;
    /// 服务实例
    type Instance: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// 未指定截止时间时使用的查询超时
    fn default_lookup_timeout(&self) -> Duration;

    fn is_shutdown(&self) -> bool;

    /// 查询服务实例，`callback` 恰好被调用一次
    fn lookup(
        &self,
        service: &Self::Service,
        deadline: Option<Duration>,
        callback: LookupCallback<Self::Instance>,
    );

    /// `lookup` 的 async 版本
    async fn lookup_async(
        &self,
        service: &Self::Service,
        deadline: Option<Duration>,
    ) -> Result<Vec<Self::Instance>> {
        let (tx, rx) = oneshot::channel();
        self.lookup(
            service,
            deadline,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        rx.await.unwrap_or(Err(DiscoveryError::Unavailable))
    }

    /// 订阅服务变更
    ///
    /// 订阅后立即执行一次查询并通过 `on_next` 投递结果，
    /// 之后每次实例列表变化都会投递新列表。返回的令牌是停止接收的唯一方式。
    fn subscribe(
        &self,
        service: &Self::Service,
        on_next: NextResultHandler<Self::Instance>,
        on_complete: CompletionHandler,
    ) -> CancellationToken;

    /// 注册服务实例列表（整体替换）
    async fn register(&self, service: Self::Service, instances: Vec<Self::Instance>);

    /// 关闭客户端，可重复调用
    fn shutdown(&self);
}
