//! IxInventory Core Crate
//!
//! 包含纯数据类型、凭证解析、配置、日志和数据层，不依赖具体的机箱协议实现。
//!
//! ## 模块结构
//! - `models`: 库存记录数据模型（机箱、板卡、端口、License、传感器、性能）
//! - `config`: 配置管理（YAML + 环境变量覆盖）
//! - `logger`: 日志初始化与内存日志存储
//! - `credential`: 机箱凭证解析器（缓存 + 凭证服务 + 本地文件降级）
//! - `database`: SQLite 数据层（快照表、标签、轮询设置）

pub mod config;
pub mod logger;
pub mod models;

// 凭证解析核心（types, source, resolver, admin）
pub mod credential;

// 数据层
pub mod database;

// 重新导出常用类型
pub use config::{Config, ConfigError};
pub use logger::{LogEntry, LogStore, SharedLogStore};
pub use models::*;
