//! 凭证来源
//!
//! - `ServiceCredentialSource`: 远程凭证服务（带超时）
//! - `FileCredentialSource`: 本地 JSON 凭证文件

use super::types::{map_from_file, map_to_file, CredentialFile, CredentialMap, ServiceResponse};
use crate::config::CredentialConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 凭证来源错误（仅在解析器内部使用，不向调用方抛出）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("凭证服务不可用: {0}")]
    ServiceUnavailable(String),

    #[error("凭证文件不可读: {0}")]
    File(String),
}

/// 凭证来源 Trait
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// 获取完整凭证映射
    async fn fetch(&self) -> Result<CredentialMap, SourceError>;

    /// 探测来源是否可用
    async fn probe(&self) -> bool {
        self.fetch().await.is_ok()
    }
}

/// 远程凭证服务
pub struct ServiceCredentialSource {
    url: Option<String>,
    client: Client,
}

impl ServiceCredentialSource {
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { url, client }
    }

    pub fn from_config(config: &CredentialConfig) -> Self {
        Self::new(
            config.service_url.clone(),
            Duration::from_secs(config.service_timeout_secs),
        )
    }
}

#[async_trait]
impl CredentialSource for ServiceCredentialSource {
    async fn fetch(&self) -> Result<CredentialMap, SourceError> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| SourceError::ServiceUnavailable("未配置凭证服务地址".to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::ServiceUnavailable(format!("请求失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::ServiceUnavailable(format!(
                "HTTP 状态码 {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::ServiceUnavailable(format!("读取响应失败: {e}")))?;

        let parsed: ServiceResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::ServiceUnavailable(format!("响应格式无效: {e}")))?;

        if !parsed.success {
            return Err(SourceError::ServiceUnavailable(
                "凭证服务返回 success=false".to_string(),
            ));
        }

        Ok(parsed.into_map())
    }
}

/// 本地凭证文件
///
/// 写入经 `write_lock` 串行化，读-改-写请使用 `update_map`。
pub struct FileCredentialSource {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &CredentialConfig) -> Self {
        Self::new(config.file_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取文件；文件不存在时返回空映射
    pub fn read_map(&self) -> Result<CredentialMap, SourceError> {
        if !self.path.exists() {
            tracing::debug!("[CREDENTIAL] 凭证文件不存在: {:?}", self.path);
            return Ok(CredentialMap::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| SourceError::File(format!("{:?}: {e}", self.path)))?;
        if content.trim().is_empty() {
            return Ok(CredentialMap::new());
        }

        let file: CredentialFile = serde_json::from_str(&content)
            .map_err(|e| SourceError::File(format!("{:?}: {e}", self.path)))?;
        Ok(map_from_file(file))
    }

    /// 在写锁内读取、修改并写回文件
    ///
    /// `f` 返回错误时文件保持不变。
    pub fn update_map<T, E>(
        &self,
        f: impl FnOnce(&mut CredentialMap) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<SourceError> + From<std::io::Error>,
    {
        let _guard = self.write_lock.lock();
        let mut map = self.read_map()?;
        let value = f(&mut map)?;
        self.write_unlocked(&map)?;
        Ok(value)
    }

    /// 整体写回文件（先写临时文件再重命名）
    pub fn write_map(&self, map: &CredentialMap) -> std::io::Result<()> {
        let _guard = self.write_lock.lock();
        self.write_unlocked(map)
    }

    fn write_unlocked(&self, map: &CredentialMap) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&map_to_file(map))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)
    }
}

#[async_trait]
impl CredentialSource for FileCredentialSource {
    async fn fetch(&self) -> Result<CredentialMap, SourceError> {
        self.read_map()
    }
}
