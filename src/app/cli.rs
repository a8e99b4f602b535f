//! 命令行参数

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ixinventory")]
#[command(version, about = "IxOS 机箱库存轮询与查询服务", long_about = None)]
pub struct Cli {
    /// 配置文件路径（默认 ~/.ixinventory/config.yaml）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 启动 HTTP 服务器和周期轮询
    Serve,

    /// 立即轮询一个类别（或 all）并输出结果
    Poll {
        /// chassis | cards | ports | licensing | sensors | performance | all
        target: String,
    },

    /// 凭证解析器操作
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum CredentialsAction {
    /// 输出解析器状态
    Status,
    /// 绕过缓存重新加载凭证
    Refresh,
}
