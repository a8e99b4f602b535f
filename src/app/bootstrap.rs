//! 应用启动引导模块
//!
//! 加载配置、初始化日志和数据库，组装凭证解析器、机箱连接器与轮询器。

use anyhow::{anyhow, Context, Result};
use ixinventory_core::config::Config;
use ixinventory_core::credential::{CredentialResolver, FileCredentialSource};
use ixinventory_core::database::{self, DbConnection};
use ixinventory_core::logger::{self, SharedLogStore};
use ixinventory_providers::RestChassisConnector;
use ixinventory_scheduler::InventoryPoller;
use std::path::Path;
use std::sync::Arc;

/// 各子命令共享的运行时组件
pub struct AppContext {
    pub config: Config,
    pub db: DbConnection,
    pub resolver: Arc<CredentialResolver>,
    pub poller: Arc<InventoryPoller>,
    pub credential_file: Arc<FileCredentialSource>,
    pub logs: SharedLogStore,
}

/// 加载配置并初始化全部组件
pub fn init(config_path: Option<&Path>) -> Result<AppContext> {
    let config = Config::load(config_path).context("加载配置失败")?;
    logger::init_tracing(&config.logging.level);
    build_context(config)
}

/// 按给定配置组装组件（不读取配置文件）
pub fn build_context(config: Config) -> Result<AppContext> {
    let db = database::init_database(&config.database.path)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("数据库初始化失败: {:?}", config.database.path))?;

    let resolver = Arc::new(CredentialResolver::from_config(&config.credentials));
    let credential_file = Arc::new(FileCredentialSource::from_config(&config.credentials));
    let connector = Arc::new(RestChassisConnector::from_config(&config.chassis));
    let poller = Arc::new(InventoryPoller::new(
        db.clone(),
        resolver.clone(),
        connector,
        config.poller.history_retention,
    ));
    let logs = logger::shared_log_store(config.logging.max_entries);

    tracing::info!(
        "[BOOTSTRAP] 初始化完成: 数据库 {:?}，凭证服务 {}，凭证文件 {:?}",
        config.database.path,
        config.credentials.service_url.as_deref().unwrap_or("未配置"),
        config.credentials.file_path
    );

    Ok(AppContext {
        config,
        db,
        resolver,
        poller,
        credential_file,
        logs,
    })
}
