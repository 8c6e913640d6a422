//! Consul 服务发现客户端

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

use super::ServiceDiscovery;
use crate::config::DiscoveryConfig;
use crate::discovery::directory::InstanceDirectory;
use crate::discovery::lifecycle::Lifecycle;
use crate::discovery::lookup::{LookupCallback, LookupEngine};
use crate::discovery::registration::RegistrationManager;
use crate::discovery::subscription::{
    CancellationToken, CompletionHandler, NextResultHandler, SubscriptionRegistry,
};
use crate::error::{CompletionReason, RegistryError};
use crate::registry::{ConsulRegistryClient, RegistryClient};

/// Consul 服务发现客户端
///
/// 本地目录是查询的数据来源，注册时尽力同步到 Consul。
///
/// # 使用示例
/// ```rust,no_run
/// use flare_discovery::{ConsulServiceDiscovery, DiscoveryConfig, ServiceDiscovery};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let discovery: ConsulServiceDiscovery<String, String> =
///     ConsulServiceDiscovery::new(DiscoveryConfig::new("http://localhost:8500"))?;
///
/// discovery.register("orders".to_string(), vec!["10.0.0.1:8080".to_string()]).await;
/// let instances = discovery.lookup_async(&"orders".to_string(), None).await?;
/// assert_eq!(instances.len(), 1);
///
/// discovery.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct ConsulServiceDiscovery<S, I> {
    config: DiscoveryConfig,
    directory: Arc<InstanceDirectory<S, I>>,
    subscriptions: Arc<SubscriptionRegistry<S, I>>,
    lifecycle: Arc<Lifecycle>,
    lookup: LookupEngine<S, I>,
    registration: RegistrationManager<S, I>,
}

impl<S, I> ConsulServiceDiscovery<S, I>
where
    S: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    I: Serialize + Clone + PartialEq + Debug + Send + Sync + 'static,
{
    /// 使用默认 Consul 客户端创建
    ///
    /// # Panics
    /// 不在 tokio 运行时内调用时 panic，其他线程请使用 `builder().runtime(handle)`
    pub fn new(config: DiscoveryConfig) -> Result<Self, RegistryError> {
        Self::builder(config).build()
    }

    pub fn builder(config: DiscoveryConfig) -> DiscoveryBuilder<S, I> {
        DiscoveryBuilder::new(config)
    }
}

impl<S, I> ConsulServiceDiscovery<S, I>
where
    S: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    I: Clone + PartialEq + Debug + Send + Sync + 'static,
{
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// 直接读取本地目录（不经过超时与关闭检查）
    pub fn cached_instances(&self, service: &S) -> Option<Vec<I>> {
        self.directory.get(service)
    }

    /// 服务当前未取消的订阅数量
    pub fn subscriber_count(&self, service: &S) -> usize {
        self.subscriptions.subscriber_count(service)
    }

    /// 清理已取消的订阅
    pub fn compact_subscriptions(&self) -> usize {
        self.subscriptions.compact()
    }
}

#[async_trait]
impl<S, I> ServiceDiscovery for ConsulServiceDiscovery<S, I>
where
    S: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    I: Clone + PartialEq + Debug + Send + Sync + 'static,
{
    type Service = S;
    type Instance = I;

    fn default_lookup_timeout(&self) -> Duration {
        self.lookup.default_timeout()
    }

    fn is_shutdown(&self) -> bool {
        self.lifecycle.is_shutdown()
    }

    fn lookup(&self, service: &S, deadline: Option<Duration>, callback: LookupCallback<I>) {
        self.lookup.lookup(service, deadline, callback);
    }

    fn subscribe(
        &self,
        service: &S,
        on_next: NextResultHandler<I>,
        on_complete: CompletionHandler,
    ) -> CancellationToken {
        if self.lifecycle.is_shutdown() {
            on_complete(CompletionReason::ServiceDiscoveryUnavailable);
            return CancellationToken::cancelled();
        }

        // 先投递一次当前状态，订阅方无需等待下一次注册。
        // 快照经注册表投递，令牌已结束时丢弃
        let token = CancellationToken::new(on_complete.clone());
        let subscriptions = self.subscriptions.clone();
        let snapshot_token = token.clone();
        let initial = on_next.clone();
        self.lookup.lookup(
            service,
            None,
            Box::new(move |result| {
                subscriptions.deliver_snapshot(&snapshot_token, &initial, result);
            }),
        );

        self.subscriptions
            .attach(service.clone(), on_next, on_complete, token)
    }

    async fn register(&self, service: S, instances: Vec<I>) {
        self.registration.register(service, instances).await;
    }

    fn shutdown(&self) {
        let subscriptions = &self.subscriptions;
        self.lifecycle.shutdown_with(|| {
            let completed = subscriptions.complete_all(CompletionReason::ServiceDiscoveryUnavailable);
            info!(completed_subscriptions = completed, "Service discovery shut down");
        });
    }
}

/// 客户端构建器
pub struct DiscoveryBuilder<S, I> {
    config: DiscoveryConfig,
    instances: HashMap<S, Vec<I>>,
    registry: Option<Arc<dyn RegistryClient<I>>>,
    runtime: Option<Handle>,
}

impl<S, I> DiscoveryBuilder<S, I>
where
    S: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    I: Serialize + Clone + PartialEq + Debug + Send + Sync + 'static,
{
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            instances: HashMap::new(),
            registry: None,
            runtime: None,
        }
    }

    /// 初始目录内容
    pub fn instances(mut self, instances: HashMap<S, Vec<I>>) -> Self {
        self.instances = instances;
        self
    }

    /// 替换远端注册客户端
    pub fn registry_client(mut self, registry: Arc<dyn RegistryClient<I>>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 指定执行查询任务的运行时
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// 构建客户端
    ///
    /// # Panics
    /// 未指定运行时且不在 tokio 运行时内调用时 panic
    pub fn build(self) -> Result<ConsulServiceDiscovery<S, I>, RegistryError> {
        let registry: Arc<dyn RegistryClient<I>> = match self.registry {
            Some(registry) => registry,
            None => Arc::new(ConsulRegistryClient::new(&self.config)?),
        };
        let runtime = self.runtime.unwrap_or_else(Handle::current);

        let directory = Arc::new(InstanceDirectory::with_instances(self.instances));
        let subscriptions = Arc::new(SubscriptionRegistry::new());
        let lifecycle = Arc::new(Lifecycle::new());

        let lookup = LookupEngine::new(
            directory.clone(),
            lifecycle.clone(),
            runtime,
            self.config.default_lookup_timeout(),
        );
        let registration = RegistrationManager::new(
            directory.clone(),
            subscriptions.clone(),
            lifecycle.clone(),
            registry,
        );

        Ok(ConsulServiceDiscovery {
            config: self.config,
            directory,
            subscriptions,
            lifecycle,
            lookup,
            registration,
        })
    }
}
