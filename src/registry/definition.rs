//! Consul 服务定义
//!
//! 一个节点上的一个服务实例，附带多个 HTTP 健康检查。字段名与注册中心的 JSON 格式一致。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 服务实例定义
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsulServiceDefinition {
    /// 节点名
    pub node: String,

    /// 节点地址
    pub address: String,

    /// 节点元数据
    #[serde(rename = "nodeMeta")]
    pub node_meta: NodeMeta,

    /// 服务信息
    pub service: ServiceDetail,

    /// 健康检查
    #[serde(default)]
    pub checks: Vec<HttpServiceCheck>,
}

impl ConsulServiceDefinition {
    pub fn new(
        node: impl Into<String>,
        address: impl Into<String>,
        node_meta: NodeMeta,
        service: ServiceDetail,
    ) -> Self {
        Self {
            node: node.into(),
            address: address.into(),
            node_meta,
            service,
            checks: Vec::new(),
        }
    }

    /// 添加健康检查
    pub fn with_check(mut self, check: HttpServiceCheck) -> Self {
        self.checks.push(check);
        self
    }
}

/// 节点元数据（外部节点 / 外部探测）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(rename = "external-node")]
    pub external_node: String,

    #[serde(rename = "external-probe")]
    pub external_probe: String,
}

impl NodeMeta {
    pub fn new(external_node: impl Into<String>, external_probe: impl Into<String>) -> Self {
        Self {
            external_node: external_node.into(),
            external_probe: external_probe.into(),
        }
    }

    /// 由注册中心外部探测的节点
    pub fn external() -> Self {
        Self::new("true", "true")
    }
}

/// 服务信息
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDetail {
    /// 实例 ID
    pub id: String,
    /// 服务名
    pub service: String,
    pub port: u16,
}

impl ServiceDetail {
    pub fn new(id: impl Into<String>, service: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
            port,
        }
    }
}

/// HTTP 健康检查
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpServiceCheck {
    pub name: String,
    /// 初始状态（passing / warning / critical）
    pub status: String,
    pub definition: HttpCheckDefinition,
}

impl HttpServiceCheck {
    pub fn new(
        name: impl Into<String>,
        status: impl Into<String>,
        definition: HttpCheckDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            definition,
        }
    }
}

/// HTTP 检查定义
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpCheckDefinition {
    pub id: String,
    pub name: String,
    /// 探测地址
    pub http: String,
    #[serde(default)]
    pub tls_server_name: String,
    #[serde(default)]
    pub tls_skip_verify: bool,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub header: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub body: String,
    /// 探测间隔（如 "30s"）
    pub interval: String,
    /// 探测超时（如 "5s"）
    pub timeout: String,
}

fn default_method() -> String {
    "GET".to_string()
}

impl HttpCheckDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        http: impl Into<String>,
        interval: impl Into<String>,
        timeout: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            http: http.into(),
            tls_server_name: String::new(),
            tls_skip_verify: false,
            method: default_method(),
            header: BTreeMap::new(),
            body: String::new(),
            interval: interval.into(),
            timeout: timeout.into(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// 追加请求头（同名头可以有多个值）
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tls(mut self, server_name: impl Into<String>, skip_verify: bool) -> Self {
        self.tls_server_name = server_name.into();
        self.tls_skip_verify = skip_verify;
        self
    }
}
