//! IxInventory - IxOS 机箱库存轮询与查询服务
//!
//! ## Workspace 结构
//! - `ixinventory-core`: 配置、日志、凭证解析器、SQLite 数据层
//! - `ixinventory-providers`: 机箱 REST 客户端与字段规整
//! - `ixinventory-scheduler`: 按类别轮询与周期调度
//! - `ixinventory-server`: axum HTTP API
//!
//! 主 crate 只负责命令行与组件组装。

pub mod app;

pub use app::{run, Cli};
