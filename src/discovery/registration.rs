//! 服务注册管理
//!
//! 注册流程：
//! 1. 已关闭则直接丢弃
//! 2. 替换本地目录并记录旧值
//! 3. 尽力推送到远端注册中心（失败只记录日志）
//! 4. 实例列表发生变化时通知订阅者

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::discovery::directory::InstanceDirectory;
use crate::discovery::lifecycle::Lifecycle;
use crate::discovery::subscription::SubscriptionRegistry;
use crate::registry::RegistryClient;

/// 注册管理器
pub struct RegistrationManager<S, I> {
    directory: Arc<InstanceDirectory<S, I>>,
    subscriptions: Arc<SubscriptionRegistry<S, I>>,
    lifecycle: Arc<Lifecycle>,
    registry: Arc<dyn RegistryClient<I>>,
}

impl<S, I> RegistrationManager<S, I>
where
    S: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    I: Clone + PartialEq + Debug + Send + Sync + 'static,
{
    pub fn new(
        directory: Arc<InstanceDirectory<S, I>>,
        subscriptions: Arc<SubscriptionRegistry<S, I>>,
        lifecycle: Arc<Lifecycle>,
        registry: Arc<dyn RegistryClient<I>>,
    ) -> Self {
        Self {
            directory,
            subscriptions,
            lifecycle,
            registry,
        }
    }

    /// 注册服务及其实例列表
    ///
    /// 从不返回错误：关闭后的注册被静默丢弃，远端失败只记录日志
    pub async fn register(&self, service: S, instances: Vec<I>) {
        if self.lifecycle.is_shutdown() {
            debug!(service = ?service, "Discarding registration after shutdown");
            return;
        }

        info!(service = ?service, instances = ?instances, "Registering service instances");

        // 目录锁只在 swap 内持有，网络调用前已释放
        let swapped = self.directory.swap(service.clone(), instances.clone());

        self.push(&service, &instances).await;

        if swapped.previous.as_deref() == Some(instances.as_slice()) {
            debug!(service = ?service, "Instances unchanged, skipping subscriber notification");
            return;
        }

        let delivered = self
            .subscriptions
            .notify(&service, swapped.generation, &instances);
        debug!(
            service = ?service,
            generation = swapped.generation,
            subscribers = delivered,
            "Notified subscribers"
        );
    }

    /// 逐个推送实例，单个失败不影响其余实例
    async fn push(&self, service: &S, instances: &[I]) {
        if instances.is_empty() {
            debug!(service = ?service, "No instances to push to remote registry");
            return;
        }

        for instance in instances {
            debug!(service = ?service, instance = ?instance, "Pushing instance to remote registry");
            if let Err(e) = self.registry.register_instance(instance).await {
                error!(
                    service = ?service,
                    instance = ?instance,
                    error = %e,
                    "Failed to register service instance with remote registry"
                );
            }
        }
    }
}
