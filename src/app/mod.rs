//! 应用核心模块
//!
//! ## 模块结构
//! - `cli` - 命令行参数（clap）
//! - `bootstrap` - 应用启动引导（配置、日志、数据库、组件组装）
//! - `runner` - 子命令分派（serve / poll / credentials）

pub mod bootstrap;
pub mod cli;
pub mod runner;

pub use bootstrap::AppContext;
pub use cli::{Cli, Command, CredentialsAction};
pub use runner::run;
