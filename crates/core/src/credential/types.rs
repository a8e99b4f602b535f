//! 凭证相关类型定义
//!
//! 定义机箱凭证记录、凭证服务响应格式、本地凭证文件格式和解析器状态。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 机箱凭证记录（每个 ip 唯一）
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub ip: String,
    pub username: String,
    pub password: String,
}

impl CredentialRecord {
    pub fn new(
        ip: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            ip: ip.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// 打开会话使用的用户名密码
    pub fn credentials(&self) -> ChassisCredentials {
        ChassisCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("ip", &self.ip)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 用户名密码对
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChassisCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ChassisCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChassisCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// ip -> 凭证记录
pub type CredentialMap = BTreeMap<String, CredentialRecord>;

/// 凭证来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSourceKind {
    Service,
    File,
}

impl std::fmt::Display for CredentialSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSourceKind::Service => write!(f, "service"),
            CredentialSourceKind::File => write!(f, "file"),
        }
    }
}

/// 凭证服务响应：`{success, credentials: [{ip, username, password}]}`
///
/// `credentials` 必须存在；`username`/`password` 缺省为空字符串。
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub credentials: Vec<ServiceCredentialEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceCredentialEntry {
    pub ip: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ServiceResponse {
    pub fn into_map(self) -> CredentialMap {
        self.credentials
            .into_iter()
            .map(|entry| {
                (
                    entry.ip.clone(),
                    CredentialRecord::new(entry.ip, entry.username, entry.password),
                )
            })
            .collect()
    }
}

/// 本地凭证文件中的条目：`{"<ip>": {"username": .., "password": ..}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialFileEntry {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub type CredentialFile = BTreeMap<String, CredentialFileEntry>;

/// 文件格式 -> 凭证映射
pub fn map_from_file(file: CredentialFile) -> CredentialMap {
    file.into_iter()
        .map(|(ip, entry)| {
            let record = CredentialRecord::new(ip.clone(), entry.username, entry.password);
            (ip, record)
        })
        .collect()
}

/// 凭证映射 -> 文件格式
pub fn map_to_file(map: &CredentialMap) -> CredentialFile {
    map.iter()
        .map(|(ip, record)| {
            (
                ip.clone(),
                CredentialFileEntry {
                    username: record.username.clone(),
                    password: record.password.clone(),
                },
            )
        })
        .collect()
}

/// 解析器状态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverStatus {
    /// 凭证服务当前是否可用（实时探测）
    pub service_available: bool,
    /// 缓存年龄（秒），从未加载时为 None
    pub cache_age_seconds: Option<f64>,
    /// 缓存是否在有效期内
    pub cache_valid: bool,
    /// 缓存中的机箱数量
    pub chassis_count: usize,
    /// 当前缓存的来源
    pub source: Option<CredentialSourceKind>,
}

/// 凭证解析错误（对调用方可见）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("机箱未配置凭证: {0}")]
    NotFound(String),
}
