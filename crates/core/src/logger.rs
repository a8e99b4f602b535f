//! 日志配置
//!
//! - `init_tracing`: 安装 tracing-subscriber（优先读取 `RUST_LOG`）
//! - `LogStore`: 内存中的最近日志，供 `/api/logs` 查看

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

/// 日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// 有界内存日志
#[derive(Debug)]
pub struct LogStore {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

pub type SharedLogStore = Arc<RwLock<LogStore>>;

impl Default for LogStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl LogStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries: max_entries.max(1),
        }
    }

    /// 追加一条日志，超出上限时丢弃最旧的
    pub fn add(&mut self, level: &str, message: &str) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: Utc::now(),
            level: level.to_string(),
            message: message.to_string(),
        });
    }

    /// 获取最近的日志（按时间正序）
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn shared_log_store(max_entries: usize) -> SharedLogStore {
    Arc::new(RwLock::new(LogStore::new(max_entries)))
}

/// 初始化全局 tracing subscriber
///
/// 重复调用时忽略（测试或多次启动场景）。
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
