//! 配置管理
//!
//! 配置来源按优先级从低到高：
//! 1. 内置默认值
//! 2. YAML 配置文件（默认 `~/.ixinventory/config.yaml`，不存在时使用默认值）
//! 3. `IXINV_*` 环境变量

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析配置文件失败: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("环境变量 {name} 的值无效: {value}")]
    InvalidEnv { name: String, value: String },

    #[error("配置无效: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub credentials: CredentialConfig,
    pub chassis: ChassisClientConfig,
    pub poller: PollerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite 文件路径
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("inventory.db"),
        }
    }
}

/// 凭证解析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// 凭证服务地址，未配置时只使用本地文件
    pub service_url: Option<String>,
    /// 凭证服务请求超时（秒）
    pub service_timeout_secs: u64,
    /// 缓存有效期（秒）
    pub cache_ttl_secs: u64,
    /// 降级到本地文件时有效期的缩放系数，取值 (0, 1]
    pub fallback_ttl_factor: f64,
    /// 本地凭证文件路径
    pub file_path: PathBuf,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            service_timeout_secs: 5,
            cache_ttl_secs: 300,
            fallback_ttl_factor: 0.5,
            file_path: data_dir().join("credentials.json"),
        }
    }
}

/// 机箱 REST 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisClientConfig {
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 机箱普遍使用自签名证书
    pub accept_invalid_certs: bool,
    /// 异步操作（License、日志收集）最大轮询次数
    pub operation_poll_attempts: u32,
    /// 异步操作轮询间隔（毫秒）
    pub operation_poll_interval_ms: u64,
}

impl Default for ChassisClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            accept_invalid_certs: true,
            operation_poll_attempts: 20,
            operation_poll_interval_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// 是否在 serve 时启动周期轮询
    pub enabled: bool,
    /// 调度器检查间隔（秒）
    pub tick_secs: u64,
    /// 每台机箱保留的性能历史条数
    pub history_retention: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: 30,
            history_retention: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// 内存日志最大条数
    pub max_entries: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            max_entries: 1000,
        }
    }
}

/// 数据目录 `~/.ixinventory`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ixinventory")
}

impl Config {
    /// 默认配置文件路径
    pub fn default_config_path() -> PathBuf {
        data_dir().join("config.yaml")
    }

    /// 从 YAML 文件加载，文件不存在时返回默认配置
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("[CONFIG] 配置文件不存在，使用默认配置: {:?}", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// 加载配置：文件 -> 环境变量覆盖 -> 校验
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);
        let mut config = Self::load_from_file(&path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 应用环境变量覆盖
    ///
    /// `lookup` 便于测试时注入变量而不修改进程环境。
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("IXINV_CREDENTIALS_SERVICE_URL") {
            let url = url.trim().to_string();
            self.credentials.service_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(value) = lookup("IXINV_CREDENTIALS_SERVICE_TIMEOUT") {
            self.credentials.service_timeout_secs =
                parse_env("IXINV_CREDENTIALS_SERVICE_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("IXINV_CREDENTIALS_CACHE_TTL") {
            self.credentials.cache_ttl_secs = parse_env("IXINV_CREDENTIALS_CACHE_TTL", &value)?;
        }
        if let Some(value) = lookup("IXINV_CREDENTIALS_FILE") {
            self.credentials.file_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("IXINV_DATABASE_PATH") {
            self.database.path = PathBuf::from(value);
        }
        if let Some(value) = lookup("IXINV_SERVER_HOST") {
            self.server.host = value;
        }
        if let Some(value) = lookup("IXINV_SERVER_PORT") {
            self.server.port = parse_env("IXINV_SERVER_PORT", &value)?;
        }
        if let Some(value) = lookup("IXINV_LOG_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port 不能为 0".to_string()));
        }
        if self.credentials.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "credentials.cache_ttl_secs 不能为 0".to_string(),
            ));
        }
        if self.credentials.service_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "credentials.service_timeout_secs 不能为 0".to_string(),
            ));
        }
        let factor = self.credentials.fallback_ttl_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "credentials.fallback_ttl_factor 必须在 (0, 1] 之间: {factor}"
            )));
        }
        if self.poller.tick_secs == 0 {
            return Err(ConfigError::Invalid("poller.tick_secs 不能为 0".to_string()));
        }
        if self.poller.history_retention == 0 {
            return Err(ConfigError::Invalid(
                "poller.history_retention 不能为 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}
