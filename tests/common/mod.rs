//! 测试辅助：模拟注册中心、记录型注册客户端和订阅探针

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::put;
use flare_discovery::{
    CompletionHandler, CompletionReason, ConsulServiceDefinition, DiscoveryError,
    HttpCheckDefinition, HttpServiceCheck, NextResultHandler, NodeMeta, RegistryClient,
    RegistryError, ServiceDetail,
};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::sync::{Notify, mpsc};
use tokio::time::{Duration, timeout};

/// 等待回调的最长时间
pub const WAIT: Duration = Duration::from_secs(2);

/// 模拟注册中心（记录所有 PUT 请求体）
#[derive(Clone)]
pub struct MockRegistry {
    pub addr: SocketAddr,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    status: Arc<AtomicU16>,
}

#[derive(Clone)]
struct MockState {
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    status: Arc<AtomicU16>,
}

async fn record(State(state): State<MockState>, body: Bytes) -> StatusCode {
    let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    state.bodies.lock().push(value);
    StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

impl MockRegistry {
    /// 在随机端口上启动模拟注册中心
    pub async fn start(path: &str) -> Self {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let status = Arc::new(AtomicU16::new(200));
        let state = MockState {
            bodies: bodies.clone(),
            status: status.clone(),
        };
        let app = Router::new().route(path, put(record)).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock registry");
        let addr = listener.local_addr().expect("Failed to read mock registry address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock registry failed");
        });

        Self {
            addr,
            bodies,
            status,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// 后续请求返回的状态码
    pub fn respond_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().clone()
    }
}

/// 记录型注册客户端
pub struct RecordingRegistry<I> {
    pub pushed: Mutex<Vec<I>>,
    pub calls: AtomicUsize,
    fail: bool,
}

impl<I> RecordingRegistry<I> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pushed: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    /// 每次推送都返回错误
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            pushed: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<I> RegistryClient<I> for RecordingRegistry<I>
where
    I: Clone + Send + Sync,
{
    async fn register_instance(&self, instance: &I) -> Result<(), RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RegistryError::InvalidUrl {
                url: "http://unreachable".to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        self.pushed.lock().push(instance.clone());
        Ok(())
    }
}

/// 第一次推送会阻塞，直到调用 `release`
pub struct GatedRegistry {
    first: AtomicBool,
    entered: Notify,
    gate: Notify,
}

impl GatedRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            first: AtomicBool::new(true),
            entered: Notify::new(),
            gate: Notify::new(),
        })
    }

    /// 等待第一次推送开始
    pub async fn wait_entered(&self) {
        timeout(WAIT, self.entered.notified())
            .await
            .expect("Timed out waiting for first push");
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl<I: Sync> RegistryClient<I> for GatedRegistry {
    async fn register_instance(&self, _instance: &I) -> Result<(), RegistryError> {
        if self.first.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        Ok(())
    }
}

/// 订阅探针：把回调转成 channel
pub struct Probe<I> {
    pub on_next: NextResultHandler<I>,
    pub on_complete: CompletionHandler,
    pub next_rx: mpsc::UnboundedReceiver<Result<Vec<I>, DiscoveryError>>,
    pub complete_rx: mpsc::UnboundedReceiver<CompletionReason>,
}

impl<I: Send + 'static> Probe<I> {
    pub fn new() -> Self {
        let (next_tx, next_rx) = mpsc::unbounded_channel();
        let (complete_tx, complete_rx) = mpsc::unbounded_channel();
        Self {
            on_next: Arc::new(move |result: Result<Vec<I>, DiscoveryError>| {
                let _ = next_tx.send(result);
            }),
            on_complete: Arc::new(move |reason: CompletionReason| {
                let _ = complete_tx.send(reason);
            }),
            next_rx,
            complete_rx,
        }
    }

    pub async fn next(&mut self) -> Result<Vec<I>, DiscoveryError> {
        timeout(WAIT, self.next_rx.recv())
            .await
            .expect("Timed out waiting for next result")
            .expect("Subscriber channel closed")
    }

    pub async fn completion(&mut self) -> CompletionReason {
        timeout(WAIT, self.complete_rx.recv())
            .await
            .expect("Timed out waiting for completion")
            .expect("Completion channel closed")
    }

    /// 当前没有待处理的 next 结果
    pub fn no_pending_next(&mut self) -> bool {
        self.next_rx.try_recv().is_err()
    }

    pub fn no_pending_completion(&mut self) -> bool {
        self.complete_rx.try_recv().is_err()
    }
}

/// 创建测试用的服务定义
pub fn definition(instance_id: &str, service: &str, port: u16) -> ConsulServiceDefinition {
    ConsulServiceDefinition::new(
        "node-1",
        "10.0.0.1",
        NodeMeta::external(),
        ServiceDetail::new(instance_id, service, port),
    )
    .with_check(HttpServiceCheck::new(
        "http check",
        "passing",
        HttpCheckDefinition::new(
            "http",
            "http check",
            format!("http://10.0.0.1:{}/health/status", port),
            "30s",
            "5s",
        ),
    ))
}
