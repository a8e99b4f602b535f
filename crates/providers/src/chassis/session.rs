//! 基于 reqwest 的机箱会话

use super::operation::{OperationState, OperationStatus};
use super::{ChassisApi, ChassisClientSettings, ChassisConnector, ChassisError};
use async_trait::async_trait;
use ixinventory_core::config::ChassisClientConfig;
use ixinventory_core::credential::ChassisCredentials;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use url::Url;

const AUTH_PATH: &str = "/platform/api/v2/auth/session";
const IXOS_PATH: &str = "/chassis/api/v2/ixos";
const LICENSE_SERVER_PATH: &str = "/platform/api/v2/licensing/servers/1/operations";
const API_KEY_HEADER: &str = "X-Api-Key";

/// 创建配置好的 HTTP 客户端
fn create_http_client(settings: &ChassisClientSettings) -> Client {
    Client::builder()
        .connect_timeout(settings.request_timeout)
        .timeout(settings.request_timeout)
        .danger_accept_invalid_certs(settings.accept_invalid_certs) // 机箱普遍使用自签名证书
        .gzip(true)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// 列表响应取第一项，对象响应原样返回
fn first_item(value: Value, what: &str) -> Result<Value, ChassisError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| ChassisError::MalformedResponse(format!("{what} 返回空列表"))),
        Value::Object(_) => Ok(value),
        other => Err(ChassisError::MalformedResponse(format!(
            "{what} 返回非对象: {other}"
        ))),
    }
}

fn list_items(value: Value, what: &str) -> Result<Vec<Value>, ChassisError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ChassisError::MalformedResponse(format!(
            "{what} 返回非列表: {other}"
        ))),
    }
}

pub struct RestChassisConnector {
    client: Client,
    settings: ChassisClientSettings,
    base_url: Option<String>,
}

impl RestChassisConnector {
    pub fn new(settings: ChassisClientSettings) -> Self {
        Self {
            client: create_http_client(&settings),
            settings,
            base_url: None,
        }
    }

    pub fn from_config(config: &ChassisClientConfig) -> Self {
        Self::new(ChassisClientSettings::from(config))
    }

    /// 所有机箱使用固定地址（测试或经反向代理访问时）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn base_url_for(&self, ip: &str) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{ip}"))
    }
}

#[async_trait]
impl ChassisConnector for RestChassisConnector {
    async fn connect(
        &self,
        ip: &str,
        credentials: &ChassisCredentials,
    ) -> Result<Box<dyn ChassisApi>, ChassisError> {
        let base_url = Url::parse(&self.base_url_for(ip))
            .map_err(|e| ChassisError::MalformedResponse(format!("机箱地址无效 {ip}: {e}")))?;
        let auth_url = base_url
            .join(AUTH_PATH)
            .map_err(|e| ChassisError::MalformedResponse(e.to_string()))?;

        tracing::debug!("[CHASSIS] 建立会话: {}", ip);
        let response = self
            .client
            .post(auth_url)
            .json(&json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ChassisError::Auth(format!("{ip} 用户名或密码错误 ({status})")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChassisError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body: Value = serde_json::from_str(&response.text().await?)
            .map_err(|e| ChassisError::MalformedResponse(format!("认证响应: {e}")))?;
        let api_key = body
            .get("apiKey")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ChassisError::Auth(format!("{ip} 认证响应缺少 apiKey")))?;

        Ok(Box::new(RestChassisSession {
            ip: ip.to_string(),
            base_url,
            api_key: api_key.to_string(),
            client: self.client.clone(),
            settings: self.settings.clone(),
        }))
    }
}

/// 已认证会话
pub struct RestChassisSession {
    ip: String,
    base_url: Url,
    api_key: String,
    client: Client,
    settings: ChassisClientSettings,
}

impl RestChassisSession {
    /// 相对路径拼接到机箱地址，绝对地址原样使用
    fn resolve_url(&self, path: &str) -> Result<Url, ChassisError> {
        self.base_url
            .join(path)
            .map_err(|e| ChassisError::MalformedResponse(format!("无效地址 {path}: {e}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ChassisError> {
        let response = request.header(API_KEY_HEADER, &self.api_key).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ChassisError::Auth(format!("{} 会话已失效", self.ip)));
        }
        if !status.is_success() {
            return Err(ChassisError::Status {
                code: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ChassisError::MalformedResponse(e.to_string()))
    }

    async fn get_json(&self, path: &str) -> Result<Value, ChassisError> {
        let url = self.resolve_url(path)?;
        self.send(self.client.get(url)).await
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, ChassisError> {
        let url = self.resolve_url(path)?;
        self.send(self.client.post(url).json(&body)).await
    }

    /// 启动异步操作并轮询至终态
    async fn run_operation(&self, name: &str, path: &str) -> Result<OperationStatus, ChassisError> {
        let started = self.post_json(path, json!({})).await?;
        let mut status: OperationStatus = serde_json::from_value(started)
            .map_err(|e| ChassisError::MalformedResponse(format!("{name}: {e}")))?;

        let attempts = self.settings.operation_poll_attempts;
        let mut attempt = 0;
        loop {
            match status.phase() {
                OperationState::Succeeded => return Ok(status),
                OperationState::Failed => {
                    return Err(ChassisError::OperationFailed(format!(
                        "{name}: {}",
                        status.failure_message()
                    )))
                }
                OperationState::InProgress => {}
            }

            if attempt >= attempts {
                return Err(ChassisError::OperationTimeout {
                    operation: name.to_string(),
                    attempts,
                });
            }
            attempt += 1;

            let poll_url = status.url.clone().ok_or_else(|| {
                ChassisError::MalformedResponse(format!("{name}: 进行中的操作缺少 url"))
            })?;
            tokio::time::sleep(self.settings.operation_poll_interval).await;

            tracing::debug!("[CHASSIS] {} 轮询 {} 第 {} 次", self.ip, name, attempt);
            let polled = self.get_json(&poll_url).await?;
            let mut next: OperationStatus = serde_json::from_value(polled)
                .map_err(|e| ChassisError::MalformedResponse(format!("{name}: {e}")))?;
            if next.url.is_none() {
                next.url = Some(poll_url);
            }
            status = next;
        }
    }

    /// 执行操作并读取结果
    async fn operation_result(&self, name: &str, path: &str) -> Result<Value, ChassisError> {
        let status = self.run_operation(name, path).await?;
        let result_url = status.result_url.ok_or_else(|| {
            ChassisError::MalformedResponse(format!("{name}: 操作完成但缺少 resultUrl"))
        })?;
        self.get_json(&result_url).await
    }
}

#[async_trait]
impl ChassisApi for RestChassisSession {
    fn ip(&self) -> &str {
        &self.ip
    }

    async fn chassis(&self) -> Result<Value, ChassisError> {
        let value = self.get_json(&format!("{IXOS_PATH}/chassis")).await?;
        first_item(value, "chassis")
    }

    async fn cards(&self) -> Result<Vec<Value>, ChassisError> {
        let value = self.get_json(&format!("{IXOS_PATH}/cards")).await?;
        list_items(value, "cards")
    }

    async fn ports(&self) -> Result<Vec<Value>, ChassisError> {
        let value = self.get_json(&format!("{IXOS_PATH}/ports")).await?;
        list_items(value, "ports")
    }

    async fn sensors(&self) -> Result<Vec<Value>, ChassisError> {
        let value = self.get_json(&format!("{IXOS_PATH}/sensors")).await?;
        list_items(value, "sensors")
    }

    async fn perf_counters(&self) -> Result<Value, ChassisError> {
        let value = self.get_json(&format!("{IXOS_PATH}/perfcounters")).await?;
        first_item(value, "perfcounters")
    }

    async fn license_host_id(&self) -> Result<String, ChassisError> {
        let value = self
            .operation_result("gethostid", &format!("{LICENSE_SERVER_PATH}/gethostid"))
            .await?;
        if let Some(host_id) = value.as_str() {
            return Ok(host_id.to_string());
        }
        value
            .get("hostId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ChassisError::MalformedResponse(format!("gethostid: {value}")))
    }

    async fn licenses(&self) -> Result<Vec<Value>, ChassisError> {
        let value = self
            .operation_result(
                "retrievelicenses",
                &format!("{LICENSE_SERVER_PATH}/retrievelicenses"),
            )
            .await?;
        list_items(value, "retrievelicenses")
    }

    async fn collect_logs(&self) -> Result<String, ChassisError> {
        let status = self
            .run_operation("collectlogs", &format!("{IXOS_PATH}/operations/collectlogs"))
            .await?;
        let result_url = status
            .result_url
            .or(status.url)
            .ok_or_else(|| ChassisError::MalformedResponse("collectlogs: 缺少 resultUrl".into()))?;
        Ok(self.resolve_url(&result_url)?.to_string())
    }
}
