//! IxOS 机箱 REST 客户端
//!
//! `ChassisConnector` 负责建立会话，`ChassisApi` 是已认证会话上的只读操作。
//! 轮询器和 HTTP 层只依赖这两个 trait，测试时可替换为内存实现。

mod operation;
mod session;

pub use operation::{OperationState, OperationStatus};
pub use session::{RestChassisConnector, RestChassisSession};

use async_trait::async_trait;
use ixinventory_core::config::ChassisClientConfig;
use ixinventory_core::credential::ChassisCredentials;
use serde_json::Value;
use std::time::Duration;

/// 机箱请求错误
#[derive(Debug, thiserror::Error)]
pub enum ChassisError {
    #[error("请求机箱失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("机箱返回错误状态 {code}: {body}")]
    Status { code: u16, body: String },

    #[error("机箱认证失败: {0}")]
    Auth(String),

    #[error("机箱响应格式无效: {0}")]
    MalformedResponse(String),

    #[error("机箱操作失败: {0}")]
    OperationFailed(String),

    #[error("机箱操作超时: {operation} 轮询 {attempts} 次仍未完成")]
    OperationTimeout { operation: String, attempts: u32 },
}

/// 客户端设置
#[derive(Debug, Clone)]
pub struct ChassisClientSettings {
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
    pub operation_poll_attempts: u32,
    pub operation_poll_interval: Duration,
}

impl Default for ChassisClientSettings {
    fn default() -> Self {
        Self::from(&ChassisClientConfig::default())
    }
}

impl From<&ChassisClientConfig> for ChassisClientSettings {
    fn from(config: &ChassisClientConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            accept_invalid_certs: config.accept_invalid_certs,
            operation_poll_attempts: config.operation_poll_attempts,
            operation_poll_interval: Duration::from_millis(config.operation_poll_interval_ms),
        }
    }
}

/// 已认证的机箱会话
#[async_trait]
pub trait ChassisApi: Send + Sync {
    /// 会话对应的机箱 ip
    fn ip(&self) -> &str;

    /// 机箱信息（列表中的第一项）
    async fn chassis(&self) -> Result<Value, ChassisError>;

    async fn cards(&self) -> Result<Vec<Value>, ChassisError>;

    async fn ports(&self) -> Result<Vec<Value>, ChassisError>;

    async fn sensors(&self) -> Result<Vec<Value>, ChassisError>;

    /// 性能计数器（Windows 机箱不支持，返回错误）
    async fn perf_counters(&self) -> Result<Value, ChassisError>;

    /// License 服务器 Host ID
    async fn license_host_id(&self) -> Result<String, ChassisError>;

    /// 已激活的 License 列表
    async fn licenses(&self) -> Result<Vec<Value>, ChassisError>;

    /// 触发日志收集，返回日志包下载地址
    async fn collect_logs(&self) -> Result<String, ChassisError>;
}

/// 机箱会话工厂
#[async_trait]
pub trait ChassisConnector: Send + Sync {
    async fn connect(
        &self,
        ip: &str,
        credentials: &ChassisCredentials,
    ) -> Result<Box<dyn ChassisApi>, ChassisError>;
}
