//! Consul 注册客户端

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, info};

use super::RegistryClient;
use crate::config::DiscoveryConfig;
use crate::error::RegistryError;

/// Consul HTTP 注册客户端
///
/// 每个实例对应一次 `PUT {url}{registration_path}`，请求体为实例的 JSON 表示
#[derive(Debug, Clone)]
pub struct ConsulRegistryClient {
    http_client: HttpClient,
    register_url: Url,
}

impl ConsulRegistryClient {
    /// 根据配置创建客户端
    pub fn new(config: &DiscoveryConfig) -> Result<Self, RegistryError> {
        let register_url = registration_url(&config.url, &config.registration_path)?;
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()?;

        debug!(url = %register_url, "Registration URL");

        Ok(Self {
            http_client,
            register_url,
        })
    }

    pub fn register_url(&self) -> &Url {
        &self.register_url
    }
}

/// 拼接注册地址（`path` 为绝对路径时替换 `base` 的路径部分）
pub fn registration_url(base: &str, path: &str) -> Result<Url, RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidUrl {
        url: format!("{}{}", base, path),
        reason,
    };
    let base = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(invalid("not a base url".to_string()));
    }
    base.join(path).map_err(|e| invalid(e.to_string()))
}

#[async_trait]
impl<I> RegistryClient<I> for ConsulRegistryClient
where
    I: Serialize + Sync,
{
    async fn register_instance(&self, instance: &I) -> Result<(), RegistryError> {
        let body = serde_json::to_vec(instance)?;
        debug!(
            url = %self.register_url,
            body = %String::from_utf8_lossy(&body),
            "Executing registration request"
        );

        let response = self
            .http_client
            .put(self.register_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RegistryError::UnexpectedStatus {
                url: self.register_url.to_string(),
                status,
            });
        }

        info!(url = %self.register_url, "Registration succeeded");
        Ok(())
    }
}
