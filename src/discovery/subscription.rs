//! 订阅注册表
//!
//! 按服务名保存订阅者。取消状态在投递时检查，已取消的订阅不会立即从列表移除，
//! 而是在后续 `subscribe` 时压缩清理。
//!
//! 回调在注册表锁内执行，保证同一服务的通知按顺序到达。
//! 回调中不要同步调用 `subscribe`/`shutdown`，需要时请 spawn 到其他任务。

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::error::{CompletionReason, Result};

/// 结果回调（初始快照与后续变更）
pub type NextResultHandler<I> = Arc<dyn Fn(Result<Vec<I>>) + Send + Sync + 'static>;

/// 完成回调
pub type CompletionHandler = Arc<dyn Fn(CompletionReason) + Send + Sync + 'static>;

struct TokenState {
    cancelled: AtomicBool,
    completion: Option<CompletionHandler>,
}

/// 取消令牌
///
/// 由订阅方持有，置位后该订阅不再收到 `next` 回调。
/// 令牌无论以取消还是关闭结束，完成回调都只会被调用一次。
#[derive(Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// 创建令牌，取消时以 `CancellationRequested` 调用完成回调
    pub fn new(completion: CompletionHandler) -> Self {
        Self {
            state: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                completion: Some(completion),
            }),
        }
    }

    /// 创建已取消的令牌（不带完成回调）
    pub fn cancelled() -> Self {
        Self {
            state: Arc::new(TokenState {
                cancelled: AtomicBool::new(true),
                completion: None,
            }),
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// 取消订阅
    ///
    /// 不会撤回已经发出的回调
    pub fn cancel(&self) {
        if self.finish() {
            if let Some(completion) = &self.state.completion {
                completion(CompletionReason::CancellationRequested);
            }
        }
    }

    /// 置位，只有第一次置位返回 true
    fn finish(&self) -> bool {
        self.state
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct Subscription<I> {
    on_next: NextResultHandler<I>,
    on_complete: CompletionHandler,
    token: CancellationToken,
}

struct ServiceSubscriptions<I> {
    subscriptions: Vec<Subscription<I>>,
    /// 最近一次已投递通知的目录版本号
    last_generation: u64,
}

impl<I> Default for ServiceSubscriptions<I> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            last_generation: 0,
        }
    }
}

struct RegistryState<S, I> {
    services: HashMap<S, ServiceSubscriptions<I>>,
    completed: bool,
}

/// 订阅注册表
pub struct SubscriptionRegistry<S, I> {
    state: Mutex<RegistryState<S, I>>,
}

impl<S, I> SubscriptionRegistry<S, I>
where
    S: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                services: HashMap::new(),
                completed: false,
            }),
        }
    }

    /// 保存订阅并返回取消令牌
    ///
    /// 若注册表已经完成（客户端已关闭），立即以 `ServiceDiscoveryUnavailable`
    /// 调用完成回调并返回已取消的令牌
    pub fn insert(
        &self,
        service: S,
        on_next: NextResultHandler<I>,
        on_complete: CompletionHandler,
    ) -> CancellationToken {
        let token = CancellationToken::new(on_complete.clone());
        self.attach(service, on_next, on_complete, token)
    }

    /// 保存使用已有令牌的订阅
    ///
    /// 注册表已经完成时置位令牌，并在置位成功时以 `ServiceDiscoveryUnavailable`
    /// 调用完成回调
    pub fn attach(
        &self,
        service: S,
        on_next: NextResultHandler<I>,
        on_complete: CompletionHandler,
        token: CancellationToken,
    ) -> CancellationToken {
        let mut state = self.state.lock();
        if state.completed {
            drop(state);
            if token.finish() {
                on_complete(CompletionReason::ServiceDiscoveryUnavailable);
            }
            return token;
        }

        let entry = state.services.entry(service).or_default();
        entry.subscriptions.retain(|subscription| !subscription.token.is_cancelled());
        entry.subscriptions.push(Subscription {
            on_next,
            on_complete,
            token: token.clone(),
        });
        token
    }

    /// 向服务的有效订阅者投递新实例列表
    ///
    /// `generation` 不大于已投递版本的通知视为过期并丢弃。返回实际投递的订阅者数量。
    pub fn notify(&self, service: &S, generation: u64, instances: &[I]) -> usize
    where
        I: Clone,
    {
        let mut state = self.state.lock();
        if state.completed {
            return 0;
        }

        let entry = state.services.entry(service.clone()).or_default();
        if generation <= entry.last_generation {
            debug!(
                service = ?service,
                generation,
                last_generation = entry.last_generation,
                "Dropping stale subscriber notification"
            );
            return 0;
        }
        entry.last_generation = generation;

        let mut delivered = 0;
        for subscription in entry
            .subscriptions
            .iter()
            .filter(|subscription| !subscription.token.is_cancelled())
        {
            (subscription.on_next)(Ok(instances.to_vec()));
            delivered += 1;
        }
        delivered
    }

    /// 投递订阅的初始快照
    ///
    /// 在注册表锁内检查令牌和完成状态，关闭结束的订阅不会再收到快照。
    /// 返回是否实际投递。
    pub fn deliver_snapshot(
        &self,
        token: &CancellationToken,
        on_next: &NextResultHandler<I>,
        result: Result<Vec<I>>,
    ) -> bool {
        let state = self.state.lock();
        if state.completed || token.is_cancelled() {
            return false;
        }
        on_next(result);
        true
    }

    /// 以 `reason` 结束所有有效订阅
    ///
    /// 只在第一次调用时生效，之后 `notify`/`insert` 不再投递。返回被结束的订阅数量。
    pub fn complete_all(&self, reason: CompletionReason) -> usize {
        let mut state = self.state.lock();
        if state.completed {
            return 0;
        }
        state.completed = true;

        let mut completed = 0;
        for (_, entry) in state.services.drain() {
            for subscription in entry.subscriptions {
                // 与并发的 cancel 竞争，只有先置位的一方调用完成回调
                if subscription.token.finish() {
                    (subscription.on_complete)(reason);
                    completed += 1;
                }
            }
        }
        completed
    }

    /// 服务当前未取消的订阅数量
    pub fn subscriber_count(&self, service: &S) -> usize {
        self.state
            .lock()
            .services
            .get(service)
            .map(|entry| {
                entry
                    .subscriptions
                    .iter()
                    .filter(|subscription| !subscription.token.is_cancelled())
                    .count()
            })
            .unwrap_or(0)
    }

    /// 移除所有已取消的订阅，返回移除数量
    pub fn compact(&self) -> usize {
        let mut state = self.state.lock();
        let mut removed = 0;
        for entry in state.services.values_mut() {
            let before = entry.subscriptions.len();
            entry
                .subscriptions
                .retain(|subscription| !subscription.token.is_cancelled());
            removed += before - entry.subscriptions.len();
        }
        removed
    }

    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }
}

impl<S, I> Default for SubscriptionRegistry<S, I>
where
    S: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
