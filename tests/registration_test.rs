//! 注册与远端推送测试

mod common;

use common::{MockRegistry, Probe, RecordingRegistry, definition};
use flare_discovery::{
    ConsulRegistryClient, ConsulServiceDefinition, ConsulServiceDiscovery, DiscoveryConfig,
    RegistryClient, RegistryError, ServiceDiscovery,
};
use std::time::Duration;

const REGISTER_PATH: &str = "/v1/catalog/register";

fn discovery_for(url: &str) -> ConsulServiceDiscovery<String, ConsulServiceDefinition> {
    let config = DiscoveryConfig::new(url).with_request_timeout(Duration::from_secs(1));
    ConsulServiceDiscovery::new(config).expect("Failed to create discovery client")
}

/// 测试：每个实例一次 PUT，请求体使用注册中心的字段名
#[tokio::test]
async fn test_register_pushes_each_instance() {
    let mock = MockRegistry::start(REGISTER_PATH).await;
    let discovery = discovery_for(&mock.url());

    let instances = vec![
        definition("orders-1", "orders", 8080),
        definition("orders-2", "orders", 8081),
    ];
    discovery.register("orders".to_string(), instances.clone()).await;

    let bodies = mock.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["node"], "node-1");
    assert_eq!(bodies[0]["address"], "10.0.0.1");
    assert_eq!(bodies[0]["nodeMeta"]["external-node"], "true");
    assert_eq!(bodies[0]["nodeMeta"]["external-probe"], "true");
    assert_eq!(bodies[0]["service"]["id"], "orders-1");
    assert_eq!(bodies[0]["service"]["service"], "orders");
    assert_eq!(bodies[0]["service"]["port"], 8080);
    assert_eq!(bodies[0]["checks"][0]["name"], "http check");
    assert_eq!(bodies[0]["checks"][0]["status"], "passing");
    assert_eq!(bodies[0]["checks"][0]["definition"]["interval"], "30s");
    assert_eq!(bodies[1]["service"]["id"], "orders-2");

    let decoded: ConsulServiceDefinition =
        serde_json::from_value(bodies[1].clone()).expect("Failed to decode pushed body");
    assert_eq!(decoded, instances[1]);
}

/// 测试：注册空列表不发送请求
#[tokio::test]
async fn test_register_empty_list_sends_nothing() {
    let mock = MockRegistry::start(REGISTER_PATH).await;
    let discovery = discovery_for(&mock.url());

    discovery.register("orders".to_string(), vec![]).await;

    assert!(mock.bodies().is_empty());
    assert_eq!(discovery.cached_instances(&"orders".to_string()), Some(vec![]));
}

/// 测试：注册中心返回非 200 时本地目录和订阅者仍然更新
#[tokio::test]
async fn test_register_non_ok_status_still_notifies() {
    let mock = MockRegistry::start(REGISTER_PATH).await;
    mock.respond_with(500);
    let discovery = discovery_for(&mock.url());

    let mut probe = Probe::new();
    let _token = discovery.subscribe(
        &"orders".to_string(),
        probe.on_next.clone(),
        probe.on_complete.clone(),
    );
    probe.next().await.expect_err("Expected unknown service snapshot");

    let instances = vec![definition("orders-1", "orders", 8080)];
    discovery.register("orders".to_string(), instances.clone()).await;

    assert_eq!(mock.bodies().len(), 1);
    assert_eq!(probe.next().await, Ok(instances.clone()));
    assert_eq!(
        discovery.lookup_async(&"orders".to_string(), None).await,
        Ok(instances)
    );
}

/// 测试：注册中心不可达不影响本地注册
#[tokio::test]
async fn test_register_unreachable_registry() {
    let discovery = discovery_for("http://127.0.0.1:1");

    let mut probe = Probe::new();
    let _token = discovery.subscribe(
        &"orders".to_string(),
        probe.on_next.clone(),
        probe.on_complete.clone(),
    );
    probe.next().await.expect_err("Expected unknown service snapshot");

    let instances = vec![definition("orders-1", "orders", 8080)];
    discovery.register("orders".to_string(), instances.clone()).await;

    assert_eq!(probe.next().await, Ok(instances));
}

/// 测试：关闭后不再推送到注册中心
#[tokio::test]
async fn test_register_after_shutdown_sends_nothing() {
    let mock = MockRegistry::start(REGISTER_PATH).await;
    let discovery = discovery_for(&mock.url());

    discovery.shutdown();
    discovery
        .register("orders".to_string(), vec![definition("orders-1", "orders", 8080)])
        .await;

    assert!(mock.bodies().is_empty());
    assert_eq!(discovery.cached_instances(&"orders".to_string()), None);
}

/// 测试：推送失败时继续推送剩余实例
#[tokio::test]
async fn test_register_continues_after_push_failure() {
    let registry = RecordingRegistry::<String>::failing();
    let discovery: ConsulServiceDiscovery<String, String> =
        ConsulServiceDiscovery::builder(DiscoveryConfig::default())
            .registry_client(registry.clone())
            .build()
            .expect("Failed to build discovery client");

    let instances = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    discovery.register("orders".to_string(), instances.clone()).await;

    assert_eq!(registry.calls(), 3);
    assert_eq!(discovery.cached_instances(&"orders".to_string()), Some(instances));
}

/// 测试：重复注册相同列表仍会推送
#[tokio::test]
async fn test_register_unchanged_list_still_pushes() {
    let registry = RecordingRegistry::<String>::new();
    let discovery: ConsulServiceDiscovery<String, String> =
        ConsulServiceDiscovery::builder(DiscoveryConfig::default())
            .registry_client(registry.clone())
            .build()
            .expect("Failed to build discovery client");

    discovery.register("orders".to_string(), vec!["a".to_string()]).await;
    discovery.register("orders".to_string(), vec!["a".to_string()]).await;

    assert_eq!(registry.calls(), 2);
    assert_eq!(*registry.pushed.lock(), vec!["a".to_string(), "a".to_string()]);
}

/// 测试：客户端直接推送，非 200 返回 UnexpectedStatus
#[tokio::test]
async fn test_registry_client_status_handling() {
    let mock = MockRegistry::start(REGISTER_PATH).await;
    let client = ConsulRegistryClient::new(&DiscoveryConfig::new(mock.url()))
        .expect("Failed to create registry client");
    assert_eq!(client.register_url().path(), REGISTER_PATH);

    let instance = definition("orders-1", "orders", 8080);
    client
        .register_instance(&instance)
        .await
        .expect("Registration failed");

    mock.respond_with(503);
    let err = client
        .register_instance(&instance)
        .await
        .expect_err("Expected non-OK status to fail");
    match err {
        RegistryError::UnexpectedStatus { status, .. } => assert_eq!(status.as_u16(), 503),
        other => panic!("Unexpected error: {}", other),
    }

    // 201 也视为失败
    mock.respond_with(201);
    assert!(client.register_instance(&instance).await.is_err());
    assert_eq!(mock.bodies().len(), 3);
}
